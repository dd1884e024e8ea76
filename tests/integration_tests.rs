mod common;

mod integration {
    mod config_tests;
    mod copy_tests;
    mod error_continuation_tests;
    mod scan_tests;
}
