mod integration_tests;
mod markdown_tests;
