/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum length of the local part of an address (RFC 5321).
const MAX_LOCAL_PART_LENGTH: usize = 64;

/// Validates and normalizes an email address.
///
/// Returns the trimmed, lowercased address when it is syntactically valid,
/// `None` otherwise. Lookups and inserts both go through this function so
/// that matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use acme_core::auth::normalize_email;
///
/// assert_eq!(normalize_email(" Test@123.com "), Some("test@123.com".to_string()));
/// assert_eq!(normalize_email("not-an-email"), None);
/// ```
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_lowercase();

    let (local, domain) = email.split_once('@')?;

    if !is_valid_local_part(local) || !is_valid_domain(domain) {
        return None;
    }

    Some(email)
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LENGTH {
        return false;
    }

    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-!#$&'*/=?^`{|}~".contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();

    // Needs at least a name and a top-level domain
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}

/// Checks the password length policy. Counts characters, not bytes.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Validates a post-login return URL to prevent open redirects.
///
/// Returns `Some(url)` if the URL is a valid relative path, `None` otherwise.
///
/// # Security
///
/// Accepted URLs:
/// - Start with a single `/` (relative path)
/// - Do not start with `//` (protocol-relative URLs like `//evil.com`)
/// - Do not contain a backslash (browsers read `/\evil.com` as `//evil.com`)
/// - Do not contain control characters
/// - Do not contain `://`
///
/// # Examples
///
/// ```
/// use acme_core::auth::validate_return_to;
///
/// assert_eq!(validate_return_to("/dashboard/invoices"), Some("/dashboard/invoices"));
/// assert_eq!(validate_return_to("//evil.com"), None);
/// assert_eq!(validate_return_to("/\\evil.com"), None);
/// assert_eq!(validate_return_to("https://evil.com"), None);
/// ```
pub fn validate_return_to(url: &str) -> Option<&str> {
    if !url.starts_with('/') {
        return None;
    }

    if url.starts_with("//") {
        return None;
    }

    if url.contains('\\') {
        return None;
    }

    if url.chars().any(|c| c.is_control()) {
        return None;
    }

    if url.contains("://") {
        return None;
    }

    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== normalize_email tests ====================

    #[test]
    fn email_accepts_plain_address() {
        assert_eq!(
            normalize_email("test@123.com"),
            Some("test@123.com".to_string())
        );
    }

    #[test]
    fn email_is_lowercased_and_trimmed() {
        assert_eq!(
            normalize_email("  User@NextMail.com\n"),
            Some("user@nextmail.com".to_string())
        );
    }

    #[test]
    fn email_accepts_plus_and_subdomains() {
        assert_eq!(
            normalize_email("first.last+tag@mail.example.co.uk"),
            Some("first.last+tag@mail.example.co.uk".to_string())
        );
    }

    #[test]
    fn email_rejects_missing_at() {
        assert_eq!(normalize_email("user.example.com"), None);
    }

    #[test]
    fn email_rejects_multiple_at() {
        assert_eq!(normalize_email("a@b@example.com"), None);
    }

    #[test]
    fn email_rejects_empty_parts() {
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("user@"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn email_rejects_domain_without_tld() {
        assert_eq!(normalize_email("user@localhost"), None);
        assert_eq!(normalize_email("user@example.c"), None);
        assert_eq!(normalize_email("user@example.123"), None);
    }

    #[test]
    fn email_rejects_bad_dots() {
        assert_eq!(normalize_email(".user@example.com"), None);
        assert_eq!(normalize_email("user.@example.com"), None);
        assert_eq!(normalize_email("us..er@example.com"), None);
        assert_eq!(normalize_email("user@example..com"), None);
    }

    #[test]
    fn email_rejects_whitespace_inside() {
        assert_eq!(normalize_email("us er@example.com"), None);
    }

    #[test]
    fn email_rejects_hyphen_edges_in_domain() {
        assert_eq!(normalize_email("user@-example.com"), None);
        assert_eq!(normalize_email("user@example-.com"), None);
    }

    // ==================== is_valid_password tests ====================

    #[test]
    fn password_accepts_six_characters() {
        assert!(is_valid_password("123456"));
    }

    #[test]
    fn password_rejects_five_characters() {
        assert!(!is_valid_password("12345"));
        assert!(!is_valid_password(""));
    }

    #[test]
    fn password_counts_characters_not_bytes() {
        // 3 characters, 6 bytes
        assert!(!is_valid_password("ééé"));
        assert!(is_valid_password("éééééé"));
    }

    // ==================== validate_return_to tests ====================

    #[test]
    fn return_to_accepts_dashboard_paths() {
        assert_eq!(validate_return_to("/dashboard"), Some("/dashboard"));
        assert_eq!(
            validate_return_to("/dashboard/invoices?page=2#top"),
            Some("/dashboard/invoices?page=2#top")
        );
    }

    #[test]
    fn return_to_rejects_absolute_urls() {
        assert_eq!(validate_return_to("https://evil.com"), None);
        assert_eq!(validate_return_to("javascript:alert(1)"), None);
        assert_eq!(validate_return_to("/redirect?url=https://evil.com"), None);
    }

    #[test]
    fn return_to_rejects_protocol_relative() {
        assert_eq!(validate_return_to("//evil.com/path"), None);
    }

    #[test]
    fn return_to_rejects_backslash() {
        assert_eq!(validate_return_to("/\\evil.com"), None);
        assert_eq!(validate_return_to("/\\/evil.com"), None);
        assert_eq!(validate_return_to("/dashboard\\..\\..\\evil"), None);
    }

    #[test]
    fn return_to_rejects_control_characters() {
        assert_eq!(validate_return_to("/path\n/evil"), None);
        assert_eq!(validate_return_to("/path\0/evil"), None);
    }

    #[test]
    fn return_to_rejects_relative_without_slash() {
        assert_eq!(validate_return_to("dashboard"), None);
        assert_eq!(validate_return_to(""), None);
    }
}
