//! Headless driver for the tagcalc formula editor.

pub mod replay;
pub mod script;
