// Not every test binary uses every fake.
#![allow(dead_code)]

pub mod fakes;
