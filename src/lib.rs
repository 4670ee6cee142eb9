pub mod config;
pub mod contract;
pub mod error;
pub mod evaluation;
pub mod fallback;
pub mod feature_set;
pub mod game_db;
pub mod game_log;
pub mod http_cache;
pub mod http_client;
pub mod league_context;
pub mod matchup;
pub mod materialize;
pub mod model;
pub mod provider;
pub mod realtime;
pub mod record_store;
pub mod table_export;
pub mod temporal;
pub mod validity;
pub mod window;
