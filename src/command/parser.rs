//! Operator line parser.
//!
//! Parsing is best-effort: only the scope byte can make a line fail. Numeric values
//! are read the way C's `strtol`/`strtod` read them, so `t=3abc` means 3 and `s=abc`
//! means 0.0.

use log::{trace, warn};

use super::{Command, CommandToSend, Header, Scope, MULTICAST_HUB};
use crate::fault::Fault;
use crate::logutil::escape_bytes;

/// A `key=value` parameter from a command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub value: String,
}

/// Split a line into its `key=value` parameters.
///
/// Fields are separated by `;`; empty fields and fields without `=` (such as the
/// scope and tag fields) are skipped. The key is everything before the first `=`.
pub fn tokenize(line: &[u8]) -> Vec<Token> {
    line.split(|b| *b == b';')
        .filter(|field| !field.is_empty())
        .filter_map(|field| {
            let eq = field.iter().position(|b| *b == b'=')?;
            Some(Token {
                key: String::from_utf8_lossy(&field[..eq]).into_owned(),
                value: String::from_utf8_lossy(&field[eq + 1..]).into_owned(),
            })
        })
        .collect()
}

/// Parse one operator line into a command.
///
/// Byte 0 selects the scope and byte 2 is taken verbatim as the command tag.
/// Multicast commands always go to the hub node regardless of `t`.
pub fn parse_command(line: &[u8]) -> Result<CommandToSend, Fault> {
    parse_command_with(line, |_| {})
}

/// Like [`parse_command`], but hands `on_field` one `key = value` line for every
/// recognized parameter, in line order, with the value as parsed.
pub fn parse_command_with<F>(line: &[u8], mut on_field: F) -> Result<CommandToSend, Fault>
where
    F: FnMut(&str),
{
    let scope = line
        .first()
        .copied()
        .and_then(Scope::from_byte)
        .ok_or(Fault::UnrecognizedHeader)?;

    let command_type = match line.get(2) {
        Some(b) => *b,
        None => {
            warn!("command line '{}' has no tag byte", escape_bytes(line));
            0
        }
    };

    let mut header = Header {
        destination: 0,
        command_type,
    };
    let mut command = Command::default();

    for token in tokenize(line) {
        match token.key.as_str() {
            "t" => {
                header.destination = u16::try_from(leading_int(&token.value)).unwrap_or(u16::MAX);
                on_field(&format!("t = {}", header.destination));
            }
            "p" => {
                command.position = clamp_i32(leading_int(&token.value));
                on_field(&format!("p = {}", command.position));
            }
            "s" => {
                command.speed = leading_float(&token.value) as f32;
                on_field(&format!("s = {:.2}", command.speed));
            }
            other => trace!("ignoring parameter '{}'", other),
        }
    }

    if scope == Scope::Multicast {
        header.destination = MULTICAST_HUB;
    }

    Ok(CommandToSend {
        command,
        header,
        scope,
    })
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn skip_space(s: &str) -> &str {
    s.trim_start_matches([' ', '\t', '\n', '\r', '\x0b', '\x0c'])
}

/// Longest leading base-10 integer, saturating on overflow; 0 if there is none.
fn leading_int(s: &str) -> i64 {
    let s = skip_space(s);
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = (b - b'0') as i64;
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}

/// Longest leading decimal float (`[+-]digits[.digits][e[+-]digits]`); 0.0 if none.
fn leading_float(s: &str) -> f64 {
    let s = skip_space(s);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_single_command() {
        let cmd = parse_command(b"S;Q;t=3;s=120.5;p=400").unwrap();
        assert_eq!(cmd.scope, Scope::Single);
        assert_eq!(cmd.header.command_type, b'Q');
        assert_eq!(cmd.header.destination, 3);
        assert_eq!(cmd.command.speed, 120.5);
        assert_eq!(cmd.command.position, 400);
    }

    #[test]
    fn multicast_goes_to_hub() {
        let cmd = parse_command(b"M;G;t=7;s=500").unwrap();
        assert_eq!(cmd.scope, Scope::Multicast);
        assert_eq!(cmd.header.destination, MULTICAST_HUB);
        assert_eq!(cmd.command.speed, 500.0);
        assert_eq!(cmd.command.position, 0);
    }

    #[test]
    fn missing_keys_default_to_zero() {
        let cmd = parse_command(b"S;H;t=2").unwrap();
        assert_eq!(cmd.header.destination, 2);
        assert_eq!(cmd.command.speed, 0.0);
        assert_eq!(cmd.command.position, 0);

        let bare = parse_command(b"S;X").unwrap();
        assert_eq!(bare.header.destination, 0);
        assert_eq!(bare.header.command_type, b'X');
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert_eq!(parse_command(b"Q;G;t=1"), Err(Fault::UnrecognizedHeader));
        assert_eq!(parse_command(b"s;G;t=1"), Err(Fault::UnrecognizedHeader));
        assert_eq!(parse_command(b""), Err(Fault::UnrecognizedHeader));
    }

    #[test]
    fn keys_in_any_order_last_wins_unknown_ignored() {
        let cmd = parse_command(b"S;G;p=-25;z=9;s=1e2;t=4;t=5").unwrap();
        assert_eq!(cmd.header.destination, 5);
        assert_eq!(cmd.command.position, -25);
        assert_eq!(cmd.command.speed, 100.0);
    }

    #[test]
    fn tag_is_passed_through_unvalidated() {
        let cmd = parse_command(b"S;~;t=1").unwrap();
        assert_eq!(cmd.header.command_type, b'~');
    }

    #[test]
    fn out_of_range_values_are_forwarded() {
        let cmd = parse_command(b"S;G;t=42;s=99999.5;p=5000000").unwrap();
        assert_eq!(cmd.header.destination, 42);
        assert_eq!(cmd.command.speed, 99999.5);
        assert_eq!(cmd.command.position, 5_000_000);

        let neg = parse_command(b"S;G;t=-1").unwrap();
        assert_eq!(neg.header.destination, u16::MAX);

        let huge = parse_command(b"S;G;p=99999999999").unwrap();
        assert_eq!(huge.command.position, i32::MAX);
    }

    #[test]
    fn garbled_values_read_their_numeric_prefix() {
        let cmd = parse_command(b"S;G;t=3abc;s=12.5rpm;p=abc").unwrap();
        assert_eq!(cmd.header.destination, 3);
        assert_eq!(cmd.command.speed, 12.5);
        assert_eq!(cmd.command.position, 0);
    }

    #[test]
    fn tokenize_skips_fields_without_equals() {
        let toks = tokenize(b"S;G;;t=1;junk;s=");
        assert_eq!(
            toks,
            vec![
                Token {
                    key: "t".into(),
                    value: "1".into()
                },
                Token {
                    key: "s".into(),
                    value: "".into()
                },
            ]
        );
    }

    #[test]
    fn leading_number_helpers() {
        assert_eq!(leading_int("  +17x"), 17);
        assert_eq!(leading_int("-"), 0);
        assert_eq!(leading_int(""), 0);
        assert_eq!(leading_float(".5"), 0.5);
        assert_eq!(leading_float("5."), 5.0);
        assert_eq!(leading_float("-2.5e1"), -25.0);
        assert_eq!(leading_float("3e"), 3.0);
        assert_eq!(leading_float("."), 0.0);
        assert_eq!(leading_float("e5"), 0.0);
    }

    #[test]
    fn field_echo_follows_line_order() {
        let mut fields = Vec::new();
        let cmd = parse_command_with(b"S;G;p=-25;s=1.5;t=4;zz=1", |f| fields.push(f.to_string()))
            .unwrap();
        assert_eq!(fields, ["p = -25", "s = 1.50", "t = 4"]);
        assert_eq!(cmd.header.destination, 4);

        // multicast echoes the typed `t`, the hub override comes after
        fields.clear();
        let cmd = parse_command_with(b"M;H;t=7", |f| fields.push(f.to_string())).unwrap();
        assert_eq!(fields, ["t = 7"]);
        assert_eq!(cmd.header.destination, MULTICAST_HUB);

        fields.clear();
        assert!(parse_command_with(b"X;G;t=1", |f| fields.push(f.to_string())).is_err());
        assert!(fields.is_empty());
    }
}
