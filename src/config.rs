use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "token-wallet")]
#[command(about = "Desktop view over a token wallet backend")]
pub struct Config {
    /// Base URL of the wallet backend
    #[arg(long, env = "TOKEN_WALLET_API_URL", default_value = "http://127.0.0.1:5000")]
    pub api_url: String,

    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    pub window_width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    pub window_height: u32,
}
