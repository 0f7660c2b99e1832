//! Matching a requested username against cached accounts.

use crate::identity::Account;

/// Find the first account whose login name matches `username`.
///
/// Returns `None` when no username was requested, so the caller goes
/// straight to interactive sign-in. Accounts are scanned in the order the
/// identity client returned them.
#[must_use]
pub fn find_account<'a>(accounts: &'a [Account], username: Option<&str>) -> Option<&'a Account> {
    let username = username.filter(|u| !u.is_empty())?;
    accounts
        .iter()
        .find(|account| username_matches(account.username(), username))
}

/// Compare two login names ignoring case.
///
/// Uses Unicode lowercase mapping, which does not depend on the process
/// locale.
#[must_use]
pub fn username_matches(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
