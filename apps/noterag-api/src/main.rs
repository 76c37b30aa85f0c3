use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = noterag_api::Args::parse();

	noterag_api::run(args).await
}
