fn main() -> anyhow::Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();
    catalog_overlay::init_tracing();
    catalog_overlay::run()
}
