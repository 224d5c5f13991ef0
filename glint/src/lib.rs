//! # A small, type-safe shader pipeline
//!
//! glint builds a graphics program out of a vertex and a fragment shader, uploads vertex data and
//! issues a draw call. It is deliberately tiny: there is exactly one way to go from shader sources
//! to pixels, and every step of that way is typed.
//!
//! - **Shaders**: [`Stage`](shader::Stage)s are compiled from source text tagged with a
//!   [`StageType`](shader::StageType). A failed compilation yields a
//!   [`StageError::CompilationFailed`](shader::StageError::CompilationFailed) carrying the log the
//!   graphics context produced, and no stage.
//! - **Programs**: a [`Program`](shader::Program) is the result of linking one vertex stage with one
//!   fragment stage. A [`Program`](shader::Program) value only exists if both stages compiled and
//!   the link succeeded, so you cannot draw with a broken program.
//! - **Vertex buffers**: [`VertexBuffer`](buffer::VertexBuffer)s hold vertex data in context memory,
//!   tagged with a [`BufferUsage`](buffer::BufferUsage) hint.
//! - **Attribute bindings**: an [`AttributeBinding`](vertex::AttributeBinding) tells the context how
//!   to read a named shader input out of a buffer.
//! - **Drawing**: [`pipeline::draw`] runs the fixed viewport / clear / attribute / draw sequence.
//! - **Scenes**: [`Scene`](scene::Scene) is the whole thing, configured with sensible defaults (a
//!   red triangle on black).
//!
//! # Backends
//!
//! glint does not talk to a GPU by itself. The interface between the typed API and an actual
//! implementation lives in [`backend`], and backend crates implement it:
//!
//! - `glint-soft`, a software implementation with its own shading-language front end. It requires
//!   no GPU and is what tests run against.
//! - `glint-gl`, forwarding to an OpenGL driver.
//! - `glint-webgl`, forwarding to a WebGL context.
//!
//! As a convention, the type variable `B` is used for backend types. `Program<B>` is a program
//! living in a `B` backend and is only usable with a [`GraphicsContext`](context::GraphicsContext)
//! which backend is `B`.
//!
//! # Resources and threads
//!
//! Resources ([`Stage`](shader::Stage), [`Program`](shader::Program),
//! [`VertexBuffer`](buffer::VertexBuffer)) are released when dropped. Graphics contexts hold
//! global state (bound buffer, active program, enabled attributes) and must stay on the thread
//! that created them.

pub mod backend;
pub mod buffer;
pub mod context;
pub mod pipeline;
pub mod scene;
pub mod shader;
pub mod vertex;
