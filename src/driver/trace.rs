// Instruction traces, one file per processor. Each line is `<op> <hex value>`:
//   0 <addr>    read
//   1 <addr>    write
//   2 <cycles>  anything else, taking that many cycles

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use crate::error::TraceError;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instr {
    Read(u64),
    Write(u64),
    Other(u64),
}

pub type Instructions = VecDeque<Instr>;

pub fn parse_trace(text: &str) -> Result<Instructions, TraceError> {
    let mut insts = VecDeque::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() { continue; }
        let malformed = || TraceError::Malformed { line: i + 1, text: line.to_string() };
        let mut parts = line.split_whitespace();
        let op = parts.next().ok_or_else(malformed)?;
        let val = parts.next().ok_or_else(malformed)?;
        let val = u64::from_str_radix(val.trim_start_matches("0x"), 16).map_err(|_| malformed())?;
        insts.push_back(match op {
            "0" => Instr::Read(val),
            "1" => Instr::Write(val),
            "2" => Instr::Other(val),
            _ => return Err(malformed()),
        });
    }
    Ok(insts)
}

pub fn read_trace(path: impl AsRef<Path>) -> Result<Instructions, TraceError> {
    let text = fs::read_to_string(path)?;
    parse_trace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_ops() {
        let insts = parse_trace("0 0x100\n2 a\n\n1 0x817b08\n").unwrap();
        assert_eq!(
            insts,
            VecDeque::from(vec![Instr::Read(0x100), Instr::Other(10), Instr::Write(0x817b08)])
        );
    }

    #[test]
    fn reports_bad_line() {
        match parse_trace("0 0x100\n7 0x1\n") {
            Err(TraceError::Malformed { line, text }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "7 0x1");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_trace("0\n").is_err());
        assert!(parse_trace("1 0xzz\n").is_err());
    }
}
