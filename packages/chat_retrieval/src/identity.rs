//! Conversions between phone numbers and chat identifiers (JIDs).
//!
//! A JID is `<user>@<server>`. Direct chats live on [`DIRECT_SERVER`], group
//! chats on [`GROUP_SERVER`]. Everything from the `@` onward is the domain
//! marker; the part before it is the phone number for direct chats.

pub const DOMAIN_MARKER: char = '@';
pub const DIRECT_SERVER: &str = "@s.whatsapp.net";
pub const GROUP_SERVER: &str = "@g.us";

pub fn phone_to_jid(phone: &str) -> String {
    format!("{phone}{DIRECT_SERVER}")
}

/// Phone portion of a JID. Empty when the input has no domain marker.
pub fn jid_to_phone(jid: &str) -> &str {
    match jid.split_once(DOMAIN_MARKER) {
        Some((phone, _)) => phone,
        None => "",
    }
}

pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SERVER)
}

/// The user part used for fuzzy sender lookups: the text before `@`, or the
/// whole input when it is a bare number.
pub(crate) fn user_part(identifier: &str) -> &str {
    identifier
        .split_once(DOMAIN_MARKER)
        .map_or(identifier, |(user, _)| user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_to_jid_appends_direct_server() {
        let jid = phone_to_jid("15551234567");
        assert_eq!(jid, "15551234567@s.whatsapp.net");
        assert!(jid.ends_with(DIRECT_SERVER));
        assert!(!is_group_jid(&jid));
    }

    #[test]
    fn jid_to_phone_strips_domain() {
        assert_eq!(jid_to_phone("15551234567@s.whatsapp.net"), "15551234567");
        assert_eq!(jid_to_phone("120363041234567890@g.us"), "120363041234567890");
        assert_eq!(jid_to_phone("15551234567"), "");
    }

    #[test]
    fn group_detection_uses_suffix_only() {
        assert!(is_group_jid("120363041234567890@g.us"));
        assert!(!is_group_jid("g.us@s.whatsapp.net"));
        assert!(!is_group_jid(""));
    }

    #[test]
    fn user_part_falls_back_to_whole_input() {
        assert_eq!(user_part("4477001@s.whatsapp.net"), "4477001");
        assert_eq!(user_part("4477001"), "4477001");
    }
}
