//! Tool surface for Microtext.
//!
//! Exposes the operations an external agent may perform on content, under
//! stable names:
//!
//! | Tool                    | Operation                                   |
//! |-------------------------|---------------------------------------------|
//! | `enumerate-pages`       | list pages with their field counts          |
//! | `read-content`          | a page's fields as a flat `path -> value` map |
//! | `write-field`           | set one field, optionally compare-and-set   |
//! | `interpret-instruction` | turn an instruction into checked edits      |
//!
//! Instruction interpretation is delegated to an [`Interpreter`]. Its
//! proposals are applied one by one, each only if the field still holds the
//! value the interpreter saw; anything else is skipped and reported.

pub mod call;
pub mod error;
pub mod interpreter;
pub mod prompt;
pub mod report;
pub mod surface;

pub use call::{
    tool_descriptors, EnumeratePagesArgs, InterpretInstructionArgs, ReadContentArgs, ToolCall,
    ToolDescriptor, WriteFieldArgs, TOOL_NAMES,
};
pub use error::{ToolError, ToolResult};
pub use interpreter::{
    CommandInterpreter, FixedInterpreter, InterpretRequest, Interpreter, ProposedChange,
};
pub use prompt::{parse_proposals, render_prompt};
pub use report::{ChangeOutcome, ChangeReport, InstructionReport, PageContent, PageSummary};
pub use surface::ToolSurface;
