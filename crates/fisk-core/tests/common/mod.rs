pub mod flaky_upstream;
