//! # vmhandles
//!
//! Command-line introspection of variable handles and conversion plans.
//!
//! Logging goes to stderr and is configured with `RUST_LOG` (default `warn`).
use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vmhandles_types::{ClassBuilder, FieldModifiers, TypeDescription};
use vmhandles_vm::{
    invoke::plan_return_conversion,
    varhandle::{array_element_var_handle, byte_array_view_var_handle, byte_buffer_view_var_handle},
    AccessMode, ByteOrder, HandleError, Lookup, SharedGlobalState, VarHandle,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Inspect variable handles and call-shape conversions"
)]
pub struct Args {
    /// Print cache statistics after the command.
    #[arg(long, global = true)]
    pub stats: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every access mode of a handle with its call shape and support.
    Modes {
        /// Variable type, e.g. `int`, `String` or `long[]`.
        #[arg(short, long = "type", value_name = "TYPE")]
        ty: String,
        #[arg(short, long, value_enum, default_value_t = Kind::Field)]
        kind: Kind,
        /// Byte order of view handles.
        #[arg(short, long, value_enum, default_value_t = Order::Native)]
        order: Order,
        /// Declare the field final.
        #[arg(long = "final")]
        is_final: bool,
    },
    /// Show how a value of one type is converted to another.
    Convert {
        #[arg(value_name = "FROM")]
        from: String,
        #[arg(value_name = "TO")]
        to: String,
        /// Allow the explicit-cast conversions.
        #[arg(long)]
        explicit: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Field,
    Static,
    Array,
    View,
    Buffer,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Native,
    Little,
    Big,
}

impl From<Order> for ByteOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Native => ByteOrder::native(),
            Order::Little => ByteOrder::LittleEndian,
            Order::Big => ByteOrder::BigEndian,
        }
    }
}

fn parse_type(name: &str) -> Result<TypeDescription, HandleError> {
    Ok(TypeDescription::parse(name)?)
}

/// Builds the handle `modes` describes. Field kinds declare a one-field
/// holder class named `Holder`.
pub fn build_handle(
    ty: &TypeDescription,
    kind: Kind,
    order: ByteOrder,
    is_final: bool,
) -> Result<VarHandle, HandleError> {
    let mut modifiers = FieldModifiers::empty();
    modifiers.set(FieldModifiers::FINAL, is_final);
    match kind {
        Kind::Field => {
            let holder = ClassBuilder::new("Holder")
                .field_with("value", ty.clone(), modifiers)
                .build();
            Lookup::trusted().find_var_handle(&holder, "value", ty)
        }
        Kind::Static => {
            let holder = ClassBuilder::new("Holder")
                .field_with("value", ty.clone(), modifiers | FieldModifiers::STATIC)
                .build();
            Lookup::trusted().find_static_var_handle(&holder, "value", ty)
        }
        Kind::Array => array_element_var_handle(&ty.array_of()?),
        Kind::View => byte_array_view_var_handle(ty, order),
        Kind::Buffer => byte_buffer_view_var_handle(ty, order),
    }
}

/// One line per access mode: name, call shape, and support.
pub fn describe_modes(handle: &VarHandle) -> Vec<String> {
    AccessMode::ALL
        .iter()
        .map(|&mode| {
            format!(
                "{:<32} {:<40} {}",
                mode.method_name(),
                handle.access_mode_type(mode).to_string(),
                if handle.is_access_mode_supported(mode) {
                    "supported"
                } else {
                    "unsupported"
                }
            )
        })
        .collect()
}

/// Describes the conversion from `from` to `to` on the return path, which
/// also covers the void rules.
pub fn describe_conversion(from: &str, to: &str, explicit: bool) -> Result<String, HandleError> {
    let from = parse_type(from)?;
    let to = parse_type(to)?;
    let plan = plan_return_conversion(&from, &to, explicit)?;
    Ok(format!("{} -> {}: {:?}", from, to, plan))
}

fn run(command: &Command) -> Result<Vec<String>, HandleError> {
    tracing::debug!(?command, "running");
    match command {
        Command::Modes {
            ty,
            kind,
            order,
            is_final,
        } => {
            let handle = build_handle(&parse_type(ty)?, *kind, (*order).into(), *is_final)?;
            let mut lines = vec![handle.to_string()];
            lines.extend(describe_modes(&handle));
            Ok(lines)
        }
        Command::Convert { from, to, explicit } => {
            Ok(vec![describe_conversion(from, to, *explicit)?])
        }
    }
}

pub fn run_cli() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&args.command);
    if args.stats {
        eprint!("{}", SharedGlobalState::get().cache_statistics());
    }
    match result {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_modes() {
        let args = Args::try_parse_from([
            "vmhandles", "modes", "--type", "int", "--kind", "view", "--order", "big",
        ])
        .unwrap();
        match args.command {
            Command::Modes { ty, kind, order, is_final } => {
                assert_eq!(ty, "int");
                assert_eq!(kind, Kind::View);
                assert_eq!(order, Order::Big);
                assert!(!is_final);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn describes_every_mode() {
        let handle = build_handle(&TypeDescription::LONG, Kind::Field, ByteOrder::native(), true).unwrap();
        let lines = describe_modes(&handle);
        assert_eq!(lines.len(), AccessMode::ALL.len());
        assert!(lines[0].starts_with("get "));
        assert!(lines[0].ends_with(" supported"));
        assert!(lines[1].ends_with("unsupported"));
    }

    #[test]
    fn describes_conversions() {
        let line = describe_conversion("int", "long", false).unwrap();
        assert!(line.starts_with("int -> long: Widen"));
        assert!(describe_conversion("long", "int", false).is_err());
        assert!(describe_conversion("long", "int", true).is_ok());
        assert!(describe_conversion("Nope", "int", true).is_err());
    }

    #[test]
    fn rejects_unsupported_view_types() {
        let err = build_handle(&TypeDescription::BOOLEAN, Kind::View, ByteOrder::BigEndian, false);
        assert!(matches!(err, Err(HandleError::IllegalArgument(_))));
    }
}
