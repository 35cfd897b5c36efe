pub mod controller;
pub mod gui;
pub mod hook;
pub mod locator;
pub mod logging;
pub mod marker;
pub mod registry;
pub mod settings;
pub mod win_util;
pub mod zorder;
