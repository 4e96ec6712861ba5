mod report;

pub use self::report::*;

/// `1 mod`, `3 mods`. Every noun the tool prints takes a plain `s`, so this is all the
/// pluralization there is.
pub fn count_of(count: usize, noun: &str) -> String {
    match count {
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::count_of;

    #[test]
    fn plural_s_past_one() {
        assert_eq!(count_of(1, "mod"), "1 mod");
        assert_eq!(count_of(0, "mod"), "0 mods");
        assert_eq!(count_of(7, "test"), "7 tests");
    }
}
