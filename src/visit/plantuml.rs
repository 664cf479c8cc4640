//! PlantUML state diagrams.

use super::Visitor;
use crate::core::{State, Transition};
use crate::engine::Machine;
use std::io::{self, Write};

/// Write a PlantUML state diagram of `machine`.
///
/// The first visited state gets the start marker and a final state, if
/// there is one, the end marker. Event transitions are labelled with the
/// event name and timer transitions with their delay.
///
/// # Example
///
/// ```rust
/// use statecraft::prelude::*;
/// use statecraft::visit::render_plantuml;
///
/// let mut builder = MachineBuilder::new(());
/// let off = builder.new_state("off");
/// let on = builder.new_state("on");
/// builder.initial_state().add_transition(&off);
/// off.add_transition(&on).on_event("TurnOn");
/// let machine = builder.build_immediate().unwrap();
///
/// let mut out = Vec::new();
/// render_plantuml(&mut out, &*machine).unwrap();
///
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "@startuml\n[*] --> initial\ninitial --> off\noff --> on : TurnOn\n@enduml\n"
/// );
/// ```
pub fn render_plantuml<W, D, M>(writer: &mut W, machine: &M) -> io::Result<()>
where
    W: Write,
    D: Send + Sync + 'static,
    M: Machine<D> + ?Sized,
{
    writeln!(writer, "@startuml")?;
    let mut renderer = Renderer {
        writer: &mut *writer,
        seen_first_state: false,
        final_state: None,
        error: None,
    };
    machine.visit(&mut renderer);
    if let Some(error) = renderer.error {
        return Err(error);
    }
    if let Some(name) = renderer.final_state {
        writeln!(writer, "{name} --> [*]")?;
    }
    writeln!(writer, "@enduml")
}

struct Renderer<'w, W: Write> {
    writer: &'w mut W,
    seen_first_state: bool,
    final_state: Option<String>,
    error: Option<io::Error>,
}

impl<W: Write> Renderer<'_, W> {
    /// Keep the first error and skip all output after it.
    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if self.error.is_none() {
            if let Err(error) = self.writer.write_fmt(line) {
                self.error = Some(error);
            }
        }
    }
}

impl<W: Write, D> Visitor<D> for Renderer<'_, W> {
    fn visit_state(&mut self, state: &State<D>) {
        if !self.seen_first_state {
            self.seen_first_state = true;
            self.emit(format_args!("[*] --> {}\n", state.name()));
        }
        if state.is_final() {
            self.final_state = Some(state.name().to_string());
        }
    }

    fn visit_transition(&mut self, transition: &Transition<D>, source: &State<D>, target: &State<D>) {
        let trigger = transition.trigger().to_string();
        if trigger.is_empty() {
            self.emit(format_args!("{} --> {}\n", source.name(), target.name()));
        } else {
            self.emit(format_args!("{} --> {} : {}\n", source.name(), target.name(), trigger));
        }
    }
}
