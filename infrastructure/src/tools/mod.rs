//! Tool implementations backed by local or containerized commands.

pub mod command;

pub use command::{
    CommandSpec, CommandTool, Communication, ContainerSpec, FORWARDED_HOST_ENV, compile_template,
};
