use time::OffsetDateTime;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Note {
	pub id: String,
	pub user_id: String,
	pub title: String,
	pub text: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
