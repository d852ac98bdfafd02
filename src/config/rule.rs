// self
use crate::_prelude::*;

/// Matches request paths for classification (auth endpoints, forced-logout areas).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PathRule {
	/// Matches the prefix on whole path segments: `/user` matches `/user/settings`, not `/users`.
	Prefix(String),
	/// Matches when the path contains the marker anywhere.
	Contains(String),
}
impl PathRule {
	/// Checks whether `path` (query string ignored) satisfies the rule.
	///
	/// Both sides are rooted before comparison, so `user/settings` is classified like
	/// `/user/settings`, matching how [`ClientConfig::resolve`](crate::config::ClientConfig::resolve)
	/// joins either form onto the base URL.
	pub fn matches(&self, path: &str) -> bool {
		let path = rooted(path.split(['?', '#']).next().unwrap_or_default());

		match self {
			PathRule::Prefix(prefix) => {
				let rooted_prefix = rooted(prefix);
				let prefix = rooted_prefix.trim_end_matches('/');

				if prefix.is_empty() {
					return true;
				}

				match path.strip_prefix(prefix) {
					Some(rest) => rest.is_empty() || rest.starts_with('/'),
					None => false,
				}
			},
			PathRule::Contains(marker) => path.contains(marker.as_str()),
		}
	}
}
impl Display for PathRule {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			PathRule::Prefix(prefix) => write!(f, "{prefix}/*"),
			PathRule::Contains(marker) => write!(f, "*{marker}*"),
		}
	}
}

fn rooted(path: &str) -> String {
	format!("/{}", path.trim_start_matches('/'))
}
