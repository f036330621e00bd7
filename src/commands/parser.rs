use std::str::FromStr;

use super::{Command, CommandError};

pub struct CommandParser;

impl CommandParser {
    pub fn parse(args: Vec<Vec<u8>>) -> Result<Command, CommandError> {
        let Some(name) = args.first() else {
            return Err(CommandError::Empty);
        };

        let name = String::from_utf8_lossy(name).to_ascii_lowercase();
        let mut args = args.into_iter().skip(1);

        match name.as_str() {
            "keys" => {
                Self::check_arity(&args, "keys", 0)?;
                Ok(Command::Keys)
            }
            "get" => {
                Self::check_arity(&args, "get", 1)?;
                Ok(Command::Get(Self::next(&mut args)))
            }
            "set" => {
                Self::check_arity(&args, "set", 2)?;
                Ok(Command::Set(Self::next(&mut args), Self::next(&mut args)))
            }
            "del" => {
                Self::check_arity(&args, "del", 1)?;
                Ok(Command::Del(Self::next(&mut args)))
            }
            "pexpire" => Self::parse_pexpire(args),
            "pttl" => {
                Self::check_arity(&args, "pttl", 1)?;
                Ok(Command::PTtl(Self::next(&mut args)))
            }
            "zadd" => Self::parse_zadd(args),
            "zrem" => {
                Self::check_arity(&args, "zrem", 2)?;
                Ok(Command::ZRem {
                    key: Self::next(&mut args),
                    member: Self::next(&mut args),
                })
            }
            "zscore" => {
                Self::check_arity(&args, "zscore", 2)?;
                Ok(Command::ZScore {
                    key: Self::next(&mut args),
                    member: Self::next(&mut args),
                })
            }
            "zquery" => Self::parse_zquery(args),
            _ => Err(CommandError::Unknown(name)),
        }
    }

    fn parse_pexpire(mut args: impl ExactSizeIterator<Item = Vec<u8>>) -> Result<Command, CommandError> {
        Self::check_arity(&args, "pexpire", 2)?;
        let key = Self::next(&mut args);
        let ttl = Self::parse_number(&Self::next(&mut args), "expect int64")?;
        Ok(Command::PExpire(key, ttl))
    }

    fn parse_zadd(mut args: impl ExactSizeIterator<Item = Vec<u8>>) -> Result<Command, CommandError> {
        Self::check_arity(&args, "zadd", 3)?;
        let key = Self::next(&mut args);
        let score = Self::parse_score(&Self::next(&mut args))?;
        let member = Self::next(&mut args);
        Ok(Command::ZAdd { key, score, member })
    }

    fn parse_zquery(mut args: impl ExactSizeIterator<Item = Vec<u8>>) -> Result<Command, CommandError> {
        Self::check_arity(&args, "zquery", 5)?;
        let key = Self::next(&mut args);
        let score = Self::parse_score(&Self::next(&mut args))?;
        let member = Self::next(&mut args);
        let offset = Self::parse_number(&Self::next(&mut args), "expect int64")?;
        let limit = Self::parse_number(&Self::next(&mut args), "expect int64")?;
        Ok(Command::ZQuery {
            key,
            score,
            member,
            offset,
            limit,
        })
    }

    fn check_arity(
        args: &impl ExactSizeIterator,
        command: &'static str,
        expected: usize,
    ) -> Result<(), CommandError> {
        if args.len() != expected {
            return Err(CommandError::Arity { command, expected });
        }
        Ok(())
    }

    // Callers check the arity first.
    fn next(args: &mut impl Iterator<Item = Vec<u8>>) -> Vec<u8> {
        args.next().unwrap_or_default()
    }

    fn parse_score(raw: &[u8]) -> Result<f64, CommandError> {
        let score: f64 = Self::parse_number(raw, "expect fp number")?;
        if score.is_nan() {
            return Err(CommandError::InvalidArgument("expect fp number".to_string()));
        }
        Ok(score)
    }

    fn parse_number<T: FromStr>(raw: &[u8], message: &str) -> Result<T, CommandError> {
        std::str::from_utf8(raw)
            .ok()
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| CommandError::InvalidArgument(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|part| part.as_bytes().to_vec()).collect()
    }

    #[test]
    fn parses_string_commands() {
        assert_eq!(CommandParser::parse(args(&["keys"])), Ok(Command::Keys));
        assert_eq!(
            CommandParser::parse(args(&["GET", "foo"])),
            Ok(Command::Get(b"foo".to_vec()))
        );
        assert_eq!(
            CommandParser::parse(args(&["set", "foo", "bar"])),
            Ok(Command::Set(b"foo".to_vec(), b"bar".to_vec()))
        );
        assert_eq!(
            CommandParser::parse(args(&["Del", "foo"])),
            Ok(Command::Del(b"foo".to_vec()))
        );
    }

    #[test]
    fn parses_ttl_commands() {
        assert_eq!(
            CommandParser::parse(args(&["pexpire", "k", "-1"])),
            Ok(Command::PExpire(b"k".to_vec(), -1))
        );
        assert_eq!(
            CommandParser::parse(args(&["pttl", "k"])),
            Ok(Command::PTtl(b"k".to_vec()))
        );
        assert_eq!(
            CommandParser::parse(args(&["pexpire", "k", "soon"])),
            Err(CommandError::InvalidArgument("expect int64".to_string()))
        );
    }

    #[test]
    fn parses_zset_commands() {
        assert_eq!(
            CommandParser::parse(args(&["zadd", "zs", "1.5", "a"])),
            Ok(Command::ZAdd {
                key: b"zs".to_vec(),
                score: 1.5,
                member: b"a".to_vec(),
            })
        );
        assert_eq!(
            CommandParser::parse(args(&["zquery", "zs", "0", "", "-2", "10"])),
            Ok(Command::ZQuery {
                key: b"zs".to_vec(),
                score: 0.0,
                member: Vec::new(),
                offset: -2,
                limit: 10,
            })
        );
    }

    #[test]
    fn rejects_bad_numbers() {
        for bad in [
            args(&["zadd", "zs", "abc", "a"]),
            args(&["zadd", "zs", "NaN", "a"]),
            args(&["zquery", "zs", "1", "a", "x", "1"]),
            args(&["zquery", "zs", "1", "a", "0", "1.5"]),
        ] {
            let err = CommandParser::parse(bad).unwrap_err();
            assert!(matches!(err, CommandError::InvalidArgument(_)));
            assert_eq!(err.code(), crate::protocol::ErrorCode::Arg);
        }
    }

    #[test]
    fn arity_and_unknown_commands() {
        assert_eq!(CommandParser::parse(Vec::new()), Err(CommandError::Empty));
        assert_eq!(
            CommandParser::parse(args(&["get"])),
            Err(CommandError::Arity {
                command: "get",
                expected: 1
            })
        );
        assert_eq!(
            CommandParser::parse(args(&["keys", "extra"])),
            Err(CommandError::Arity {
                command: "keys",
                expected: 0
            })
        );
        let unknown = CommandParser::parse(args(&["FLUSHALL"])).unwrap_err();
        assert_eq!(unknown, CommandError::Unknown("flushall".to_string()));
        assert_eq!(
            unknown.to_value(),
            crate::protocol::Value::error(crate::protocol::ErrorCode::Unknown, "unknown command.")
        );
    }
}
