//! Hex dump - 16 bytes per row with offset and ASCII columns.

const ROW: usize = 16;

/// Render `data` as a hex dump whose offsets start at `base`
pub fn render(data: &[u8], base: u64) -> String {
    let mut lines = Vec::with_capacity(data.len().div_ceil(ROW));

    for (row_index, bytes) in data.chunks(ROW).enumerate() {
        let offset = base.wrapping_add((row_index * ROW) as u64);

        let mut hex_str = String::with_capacity(3 * ROW + 1);
        for i in 0..ROW {
            match bytes.get(i) {
                Some(byte) => hex_str.push_str(&format!("{:02x} ", byte)),
                None => hex_str.push_str("   "),
            }
            if i == 7 {
                hex_str.push(' ');
            }
        }

        let ascii_str: String = bytes
            .iter()
            .map(|&b| if (0x20..=0x7e).contains(&b) { b as char } else { '.' })
            .collect();

        lines.push(format!("{:016x}  {} |{}|", offset, hex_str, ascii_str));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(render(&[], 0x1000), "");
    }

    #[test]
    fn test_full_and_partial_rows() {
        let data: Vec<u8> = (0x41..0x41 + 18).collect();
        let out = render(&data, 0x1000);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "0000000000001000  41 42 43 44 45 46 47 48  49 4a 4b 4c 4d 4e 4f 50  |ABCDEFGHIJKLMNOP|"
        );
        assert!(lines[1].starts_with("0000000000001010  51 52 "));
        assert!(lines[1].ends_with("|QR|"));
        assert_eq!(lines[0].len(), lines[1].len() + 14);
    }

    #[test]
    fn test_non_printable_as_dots() {
        let out = render(b"a\x00\x7f\n", 0);
        assert!(out.ends_with("|a...|"));
    }
}
