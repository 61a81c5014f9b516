use std::collections::HashMap;
use std::path::PathBuf;

/// Flag/value pairs from the command line. Flags are unordered and
/// optional; repeating a flag overwrites its earlier value; a token is a
/// flag iff it starts with `-` followed by an ASCII letter, and any other
/// token is the value of the flag before it.
#[derive(Debug, Default)]
pub struct ArgumentMap {
    map: HashMap<String, Option<String>>,
}

fn is_flag(arg: &str) -> bool {
    let mut chars = arg.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

impl ArgumentMap {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut map: HashMap<String, Option<String>> = HashMap::new();
        let mut previous: Option<String> = None;
        for arg in args {
            if is_flag(&arg) {
                map.insert(arg.clone(), None);
                previous = Some(arg);
            } else if let Some(flag) = &previous {
                let slot = map.get_mut(flag).expect("previous flag was inserted");
                if slot.is_none() {
                    *slot = Some(arg);
                }
            }
            // A value with no preceding flag is dropped.
        }
        ArgumentMap { map }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.map.contains_key(flag)
    }

    pub fn string(&self, flag: &str) -> Option<&str> {
        self.map.get(flag).and_then(Option::as_deref)
    }

    pub fn path(&self, flag: &str) -> Option<PathBuf> {
        self.string(flag).map(PathBuf::from)
    }

    pub fn path_or(&self, flag: &str, default: &str) -> PathBuf {
        self.string(flag).unwrap_or(default).into()
    }

    /// The flag's value as an integer; missing or unparseable values fall
    /// back to the default.
    pub fn integer_or(&self, flag: &str, default: i64) -> i64 {
        self.string(flag)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ArgumentMap {
        ArgumentMap::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn pairs_flags_with_their_values() {
        let map = parse(&["-text", "corpus", "-exact", "-threads", "8"]);
        assert_eq!(map.string("-text"), Some("corpus"));
        assert!(map.has_flag("-exact"));
        assert_eq!(map.string("-exact"), None);
        assert_eq!(map.integer_or("-threads", 5), 8);
    }

    #[test]
    fn repeated_flags_overwrite() {
        let map = parse(&["-index", "first.json", "-index", "second.json"]);
        assert_eq!(map.string("-index"), Some("second.json"));
    }

    #[test]
    fn negative_numbers_are_values_not_flags() {
        let map = parse(&["-max", "-3"]);
        assert_eq!(map.string("-max"), Some("-3"));
        assert_eq!(map.integer_or("-max", 1), -3);
        assert!(!map.has_flag("-3"));
    }

    #[test]
    fn dangling_values_are_dropped() {
        let map = parse(&["stray", "-query", "q.txt", "extra"]);
        assert!(!map.has_flag("stray"));
        assert_eq!(map.string("-query"), Some("q.txt"));
    }

    #[test]
    fn defaults_apply_when_missing_or_malformed() {
        let map = parse(&["-threads", "lots", "-counts"]);
        assert_eq!(map.integer_or("-threads", 5), 5);
        assert_eq!(map.path_or("-counts", "counts.json"), PathBuf::from("counts.json"));
        assert_eq!(map.path_or("-index", "index.json"), PathBuf::from("index.json"));
    }
}
