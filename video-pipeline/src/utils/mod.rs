pub mod studio_client;
