pub mod check;
pub mod logs;
pub mod pool;
pub mod tv_code;
pub mod watch;
