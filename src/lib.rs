pub mod app_config;
pub mod constants;
pub mod db;
pub mod ip;
pub mod janitor;
pub mod lifecycle;
pub mod moderation;
pub mod notifications;
pub mod orm;
pub mod poster_id;
pub mod storage;
pub mod web;
