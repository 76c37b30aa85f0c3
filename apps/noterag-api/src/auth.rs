use std::{
	collections::HashMap,
	sync::Mutex,
};

use uuid::Uuid;

/// Resolves bearer tokens to user identities. The HTTP layer never sees passwords
/// beyond register/login; everything downstream is keyed by the resolved identity.
pub trait UserDirectory: Send + Sync {
	fn register(&self, email: &str, password: &str) -> Result<String, DirectoryError>;
	fn login(&self, email: &str, password: &str) -> Option<String>;
	fn verify(&self, token: &str) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
	#[error("An account already exists for this email.")]
	EmailTaken,

	#[error("{0}")]
	InvalidCredentials(String),
}

struct UserRecord {
	salt: Uuid,
	hash: blake3::Hash,
}

#[derive(Default)]
struct Inner {
	users: HashMap<String, UserRecord>,
	// token -> email
	tokens: HashMap<String, String>,
}

/// Process-local directory: salted blake3 password hashes and opaque UUID bearer
/// tokens. Accounts and sessions do not survive a restart.
#[derive(Default)]
pub struct InMemoryDirectory {
	inner: Mutex<Inner>,
}
impl InMemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}
}
impl UserDirectory for InMemoryDirectory {
	fn register(&self, email: &str, password: &str) -> Result<String, DirectoryError> {
		let email = email.trim();

		if email.is_empty() || !email.contains('@') {
			return Err(DirectoryError::InvalidCredentials(
				"A valid email address is required.".to_string(),
			));
		}
		if password.is_empty() {
			return Err(DirectoryError::InvalidCredentials(
				"A non-empty password is required.".to_string(),
			));
		}

		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		if inner.users.contains_key(email) {
			return Err(DirectoryError::EmailTaken);
		}

		let salt = Uuid::new_v4();

		inner
			.users
			.insert(email.to_string(), UserRecord { salt, hash: hash_password(salt, password) });

		Ok(issue_token(&mut inner, email))
	}

	fn login(&self, email: &str, password: &str) -> Option<String> {
		let email = email.trim();
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());
		let record = inner.users.get(email)?;

		// blake3::Hash comparison is constant-time.
		if hash_password(record.salt, password) != record.hash {
			return None;
		}

		Some(issue_token(&mut inner, email))
	}

	fn verify(&self, token: &str) -> Option<String> {
		let inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		inner.tokens.get(token).cloned()
	}
}

fn hash_password(salt: Uuid, password: &str) -> blake3::Hash {
	let mut hasher = blake3::Hasher::new();

	hasher.update(salt.as_bytes());
	hasher.update(password.as_bytes());

	hasher.finalize()
}

fn issue_token(inner: &mut Inner, email: &str) -> String {
	let token = Uuid::new_v4().simple().to_string();

	inner.tokens.insert(token.clone(), email.to_string());

	token
}
