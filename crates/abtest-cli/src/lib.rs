//! Command line front-end for `abtest_classifiers`: configuration loading
//! with command line overrides, and one runner per subcommand.
pub mod input;
pub mod runner;
