#![allow(dead_code)]

pub mod coordinator;
pub mod observer;
