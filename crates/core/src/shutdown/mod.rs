pub mod exit_hooks;
