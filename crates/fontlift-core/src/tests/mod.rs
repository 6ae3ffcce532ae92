mod config;
mod download;
mod storage;
mod support;
