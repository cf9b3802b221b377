#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

#[path = "../codec/mod.rs"]
pub mod codec;

#[path = "../model/mod.rs"]
pub mod model;

#[path = "../session/mod.rs"]
pub mod session;

#[path = "../render/mod.rs"]
pub mod render;
