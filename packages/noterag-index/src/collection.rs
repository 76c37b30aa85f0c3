/// Maps an arbitrary user identity onto the collection-name charset. Characters
/// outside `[A-Za-z0-9_-]` become `_`, runs of `_` collapse to one, and leading or
/// trailing `_` are stripped. An identity that sanitizes to nothing falls back to
/// `default`, which also serves anonymous callers. Distinct identities can therefore
/// collide onto one collection; payload `user_id` still records the exact owner.
pub fn sanitize_identity(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut last_was_underscore = false;

	for ch in raw.chars() {
		let mapped = if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' };

		if mapped == '_' {
			if last_was_underscore {
				continue;
			}

			last_was_underscore = true;
		} else {
			last_was_underscore = false;
		}

		out.push(mapped);
	}

	let trimmed = out.trim_matches('_');

	if trimmed.is_empty() { "default".to_string() } else { trimmed.to_string() }
}

/// Full collection name: `<prefix>_<sanitized identity>`, truncated to the backend's
/// name-length cap. Both sides are ASCII after sanitization, so byte truncation is
/// boundary-safe.
pub(crate) fn collection_name(prefix: &str, user: Option<&str>, max_chars: usize) -> String {
	let identity = sanitize_identity(user.unwrap_or("default"));
	let mut name = format!("{prefix}_{identity}");

	name.truncate(max_chars);

	name
}
