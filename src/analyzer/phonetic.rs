//! Soundex phonetic coding.

fn strip_to_uppercase_letters(input: &str) -> Vec<u8> {
    input
        .to_uppercase()
        .bytes()
        .filter(|b| b.is_ascii_uppercase())
        .collect()
}

fn code_of(b: u8) -> u8 {
    match b {
        b'B' | b'F' | b'P' | b'V' => b'1',
        b'C' | b'G' | b'J' | b'K' | b'Q' | b'S' | b'X' | b'Z' => b'2',
        b'D' | b'T' => b'3',
        b'L' => b'4',
        b'M' | b'N' => b'5',
        b'R' => b'6',
        _ => b'0',
    }
}

/// Soundex code for `input`: first letter plus up to three digits. Returns
/// an empty string for input with no ASCII letters.
pub fn soundex(input: &str) -> String {
    let clean = strip_to_uppercase_letters(input);
    if clean.is_empty() {
        return String::new();
    }

    let mut res = [b'0'; 4];
    res[0] = clean[0];
    let mut count = 1usize;
    let mut last_code = code_of(clean[0]);

    for &b in &clean[1..] {
        if count >= 4 {
            break;
        }
        let curr_code = code_of(b);
        if curr_code == b'0' {
            last_code = b'0';
            continue;
        }
        if curr_code == last_code {
            continue;
        }
        res[count] = curr_code;
        last_code = curr_code;
        count += 1;
    }

    String::from_utf8(res.to_vec()).expect("soundex buffer is always ASCII")
}
