pub mod leave_guard;
