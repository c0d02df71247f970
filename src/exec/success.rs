// src/exec/success.rs

//! Exit-code classification.

use std::collections::BTreeSet;
use std::process::ExitStatus;

/// Set of exit codes that count as success.
///
/// An empty set means "only 0 succeeds", never "everything succeeds".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessCodes {
    codes: BTreeSet<i32>,
}

impl SuccessCodes {
    pub fn new<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_failure(&self, code: i32) -> bool {
        is_failure(code, &self.codes)
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.codes.iter().copied()
    }
}

impl FromIterator<i32> for SuccessCodes {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Classify `code` against an arbitrary collection of success codes.
///
/// Order and duplicates in `success_codes` do not matter.
pub fn is_failure<'a, I>(code: i32, success_codes: I) -> bool
where
    I: IntoIterator<Item = &'a i32>,
{
    let mut any = false;
    for &ok in success_codes {
        if ok == code {
            return false;
        }
        any = true;
    }
    if any { true } else { code != 0 }
}

/// Numeric exit code for a finished process.
///
/// On Unix a child killed by a signal reports `128 + signal`, like a shell
/// does. `-1` when no code can be determined at all.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }

    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_means_only_zero_succeeds() {
        let none = SuccessCodes::default();
        assert!(!none.is_failure(0));
        assert!(none.is_failure(1));
        assert!(none.is_failure(-1));
    }

    #[test]
    fn explicit_set_replaces_zero() {
        let codes = SuccessCodes::new([0, 3]);
        assert!(!codes.is_failure(3));
        assert!(!codes.is_failure(0));
        assert!(codes.is_failure(1));

        // 0 is not implicitly accepted once a set is configured.
        let only_two = SuccessCodes::new([2]);
        assert!(only_two.is_failure(0));
        assert!(!only_two.is_failure(2));
    }

    #[test]
    fn free_function_ignores_duplicates() {
        assert!(!is_failure(3, &[3, 3, 0]));
        assert!(is_failure(4, &[3, 3, 0]));
        assert!(is_failure(1, &Vec::<i32>::new()));
    }

    #[cfg(unix)]
    #[test]
    fn signal_exit_maps_to_shell_convention() {
        use std::os::unix::process::ExitStatusExt;
        // Raw wait status for "killed by SIGKILL".
        let status = ExitStatus::from_raw(9);
        assert_eq!(exit_code(&status), 137);

        let status = ExitStatus::from_raw(3 << 8);
        assert_eq!(exit_code(&status), 3);
    }
}
