use crate::helpers::base_path;

pub fn load_dotenv() {
    if dotenv::dotenv().is_ok() {
        println!("Loaded local .env")
    }
    // Also load <config dir>/.env if it exists
    let config_dotenv = base_path::config_dir().join(".env");
    if dotenv::from_path(&config_dotenv).is_ok() {
        println!("Loaded {}", config_dotenv.display());
    }
}
