pub mod lock_authority;
