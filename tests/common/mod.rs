#![allow(dead_code, unused_imports)]

pub use watchrun_test_utils::{builders, fakes, fast_options, init_tracing, with_timeout};
