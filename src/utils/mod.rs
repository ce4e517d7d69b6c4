pub(crate) mod async_task;
pub mod file_io;
pub(crate) mod time;

#[cfg(test)]
mod async_task_test;
#[cfg(test)]
mod file_io_test;
#[cfg(test)]
mod time_test;
