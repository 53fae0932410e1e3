pub mod server;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        access_token_secret: String,
        refresh_token_secret: String,
        access_token_ttl: i64,
        refresh_token_ttl: i64,
        public_url: String,
        media_url: String,
    },
}
