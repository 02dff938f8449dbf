/// Author name for new drafts: the explicit one, else the OS user's real name.
pub fn get_name(explicit: Option<&str>) -> String {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    let name = whoami::realname();
    if name.trim().is_empty() {
        return whoami::username();
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_name_wins() {
        assert_eq!(get_name(Some("  Jane Doe ")), "Jane Doe");
    }
}
