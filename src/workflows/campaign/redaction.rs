//! Redaction pass applied to outreach copy before it is stored.
//!
//! Drafting collaborators echo profile text back at us, so anything that looks
//! like a direct contact detail is masked at the storage boundary rather than
//! trusting the collaborator to have stripped it.

const EMAIL_MASK: &str = "[redacted-email]";
const NUMBER_MASK: &str = "[redacted-number]";

/// Mask e-mail addresses and phone-like digit runs in draft text, preserving
/// the surrounding copy and whitespace.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut token = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            flush_token(&mut out, &token);
            token.clear();
            out.push(ch);
        } else {
            token.push(ch);
        }
    }
    flush_token(&mut out, &token);
    out
}

fn flush_token(out: &mut String, token: &str) {
    if token.is_empty() {
        return;
    }
    let trailing: String = token
        .chars()
        .rev()
        .take_while(|ch| matches!(ch, '.' | ',' | ';' | ':' | '!' | '?' | ')'))
        .collect();
    let core = &token[..token.len() - trailing.len()];
    if looks_like_email(core) {
        out.push_str(EMAIL_MASK);
    } else if looks_like_phone(core) {
        out.push_str(NUMBER_MASK);
    } else {
        out.push_str(core);
    }
    out.extend(trailing.chars().rev());
}

fn looks_like_email(token: &str) -> bool {
    match token.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

fn looks_like_phone(token: &str) -> bool {
    let digits = token.chars().filter(char::is_ascii_digit).count();
    digits >= 7 && token.chars().all(|ch| matches!(ch, '0'..='9' | '+' | '-' | '(' | ')' | '.' | ' '))
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn masks_email_addresses() {
        let redacted = redact("Reach me at ada@example.com, thanks!");
        assert_eq!(redacted, "Reach me at [redacted-email], thanks!");
    }

    #[test]
    fn masks_phone_numbers() {
        let redacted = redact("Call +1-555-0100-321 today");
        assert_eq!(redacted, "Call [redacted-number] today");
    }

    #[test]
    fn leaves_ordinary_copy_untouched() {
        let copy = "Hi Ada,\n\nI admired your work on release tooling.";
        assert_eq!(redact(copy), copy);
    }

    #[test]
    fn short_numbers_survive() {
        assert_eq!(redact("Top 3 of 2026"), "Top 3 of 2026");
    }
}
