//! `stream` shim: a push/listener `PassThrough` and a `Readable` stand-in.
//!
//! The delivery bookkeeping ([`StreamState`]) is plain host data. Guest
//! values (chunks, listeners, the error) live in a state object attached to
//! each stream so the engine can trace them.

use std::cell::RefCell;
use std::rc::Rc;

use rquickjs::function::{Opt, This};
use rquickjs::{Array, Ctx, Exception, Function, Object, Value};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "stream";

const STATE_PROPERTY: &str = "_passThroughState";

const BIND_SOURCE: &str = r#"(function (f, self) {
    return function (...args) {
        return f.apply(self, args);
    };
})"#;

/// One listener invocation computed by [`StreamState::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Data { listener: usize, chunk: usize },
    Error { listener: usize },
    End { listener: usize },
}

/// Delivery bookkeeping of a `PassThrough`.
///
/// Each data listener owns a cursor into the chunk buffer and catches up
/// from it on every delivery. One-shot listeners fire at most once. Once
/// errored, only error listeners fire.
#[derive(Debug, Default)]
pub struct StreamState {
    chunks: usize,
    data_cursors: Vec<usize>,
    error_fired: Vec<bool>,
    end_fired: Vec<bool>,
    ended: bool,
    errored: bool,
}

impl StreamState {
    /// Buffers a chunk and returns its index.
    pub fn push(&mut self) -> usize {
        self.chunks += 1;
        self.chunks - 1
    }

    /// Adds a data listener starting at the first chunk.
    pub fn add_data_listener(&mut self) -> usize {
        self.data_cursors.push(0);
        self.data_cursors.len() - 1
    }

    /// Adds a one-shot error listener.
    pub fn add_error_listener(&mut self) -> usize {
        self.error_fired.push(false);
        self.error_fired.len() - 1
    }

    /// Adds a one-shot end listener.
    pub fn add_end_listener(&mut self) -> usize {
        self.end_fired.push(false);
        self.end_fired.len() - 1
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Marks the stream errored. Ignored once ended.
    pub fn fail(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.errored = true;
        true
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_errored(&self) -> bool {
        self.errored
    }

    /// Computes the pending listener invocations, marking them delivered.
    pub fn deliver(&mut self) -> Vec<Delivery> {
        let mut plan = Vec::new();

        if self.errored {
            for (listener, fired) in self.error_fired.iter_mut().enumerate() {
                if !*fired {
                    *fired = true;
                    plan.push(Delivery::Error { listener });
                }
            }
            return plan;
        }

        for (listener, cursor) in self.data_cursors.iter_mut().enumerate() {
            for chunk in *cursor..self.chunks {
                plan.push(Delivery::Data { listener, chunk });
            }
            *cursor = self.chunks;
        }

        if self.ended {
            for (listener, fired) in self.end_fired.iter_mut().enumerate() {
                if !*fired {
                    *fired = true;
                    plan.push(Delivery::End { listener });
                }
            }
        }

        plan
    }
}

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "Stream")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    let init = Function::new(ctx.clone(), |ctx: Ctx<'js>, this: This<Object<'js>>| {
        init_pass_through(&ctx, &this.0)
    })?;
    exports.set("PassThrough", js::constructor(ctx, "PassThrough", init)?)?;

    let readable = Function::new(ctx.clone(), |_this: This<Value<'js>>| {})?;
    exports.set("Readable", js::constructor(ctx, "Readable", readable)?)?;

    Ok(())
}

fn init_pass_through<'js>(ctx: &Ctx<'js>, stream: &Object<'js>) -> rquickjs::Result<()> {
    let shared = Object::new(ctx.clone())?;
    for key in ["chunks", "data", "error", "end"] {
        shared.set(key, Array::new(ctx.clone())?)?;
    }
    stream.set(STATE_PROPERTY, shared)?;

    let state = Rc::new(RefCell::new(StreamState::default()));

    let s = Rc::clone(&state);
    stream.set(
        "push",
        Function::new(ctx.clone(), move |this: This<Object<'js>>, chunk: Value<'js>| {
            let index = s.borrow_mut().push();
            let chunks: Array = shared_state(&this.0)?.get("chunks")?;
            chunks.set(index, chunk)?;
            Ok::<_, rquickjs::Error>(true)
        })?
        .with_name("push")?,
    )?;

    let s = Rc::clone(&state);
    stream.set(
        "on",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, this: This<Object<'js>>, event: String, listener: Function<'js>| {
                let (list, index) = match event.as_str() {
                    "data" => ("data", s.borrow_mut().add_data_listener()),
                    "error" => ("error", s.borrow_mut().add_error_listener()),
                    "end" => ("end", s.borrow_mut().add_end_listener()),
                    other => {
                        return Err(Exception::throw_type(
                            &ctx,
                            &format!("PassThrough.on: unsupported event '{other}'"),
                        ));
                    }
                };
                register(&this.0, list, index, listener)?;
                deliver(&this.0, &s)?;
                Ok(this.0)
            },
        )?
        .with_name("on")?,
    )?;

    let s = Rc::clone(&state);
    stream.set(
        "once",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, this: This<Object<'js>>, event: String, listener: Function<'js>| {
                let (list, index) = match event.as_str() {
                    "error" => ("error", s.borrow_mut().add_error_listener()),
                    "end" => ("end", s.borrow_mut().add_end_listener()),
                    other => {
                        return Err(Exception::throw_type(
                            &ctx,
                            &format!("PassThrough.once: unsupported event '{other}'"),
                        ));
                    }
                };
                register(&this.0, list, index, listener)?;
                deliver(&this.0, &s)?;
                Ok(this.0)
            },
        )?
        .with_name("once")?,
    )?;

    let s = Rc::clone(&state);
    stream.set(
        "write",
        Function::new(
            ctx.clone(),
            move |ctx: Ctx<'js>, this: This<Object<'js>>, chunk: Value<'js>| {
                write(&ctx, &this.0, &s, chunk)
            },
        )?
        .with_name("write")?,
    )?;

    let s = state;
    stream.set(
        "end",
        Function::new(ctx.clone(), move |this: This<Object<'js>>| {
            s.borrow_mut().end();
            deliver(&this.0, &s)?;
            Ok::<_, rquickjs::Error>(this.0)
        })?
        .with_name("end")?,
    )?;

    Ok(())
}

fn shared_state<'js>(stream: &Object<'js>) -> rquickjs::Result<Object<'js>> {
    stream.get(STATE_PROPERTY)
}

fn register<'js>(
    stream: &Object<'js>,
    list: &str,
    index: usize,
    listener: Function<'js>,
) -> rquickjs::Result<()> {
    let listeners: Array = shared_state(stream)?.get(list)?;
    listeners.set(index, listener)
}

fn write<'js>(
    ctx: &Ctx<'js>,
    stream: &Object<'js>,
    state: &Rc<RefCell<StreamState>>,
    chunk: Value<'js>,
) -> rquickjs::Result<bool> {
    let Some(consumer) = stream.get::<_, Option<Function>>("_write")? else {
        return Err(Exception::throw_type(
            ctx,
            "PassThrough.write: _write is not implemented",
        ));
    };

    let s = Rc::clone(state);
    let on_write = Function::new(
        ctx.clone(),
        move |this: This<Object<'js>>, err: Opt<Value<'js>>| {
            if let Some(err) = err.0.filter(|e| !e.is_null() && !e.is_undefined()) {
                let failed = s.borrow_mut().fail();
                if failed {
                    shared_state(&this.0)?.set("reason", err)?;
                }
            }
            deliver(&this.0, &s)
        },
    )?;
    let callback: Function = js::glue(ctx, "node:stream", BIND_SOURCE, (on_write, stream.clone()))?;

    consumer.call::<_, ()>((This(stream.clone()), chunk, "utf8", callback))?;
    Ok(true)
}

fn deliver<'js>(stream: &Object<'js>, state: &Rc<RefCell<StreamState>>) -> rquickjs::Result<()> {
    let plan = state.borrow_mut().deliver();
    if plan.is_empty() {
        return Ok(());
    }

    let shared = shared_state(stream)?;
    let chunks: Array = shared.get("chunks")?;
    let data: Array = shared.get("data")?;
    let errors: Array = shared.get("error")?;
    let ends: Array = shared.get("end")?;

    for delivery in plan {
        match delivery {
            Delivery::Data { listener, chunk } => {
                let listener: Function = data.get(listener)?;
                let chunk: Value = chunks.get(chunk)?;
                listener.call::<_, ()>((This(stream.clone()), chunk))?;
            }
            Delivery::Error { listener } => {
                let listener: Function = errors.get(listener)?;
                let reason: Value = shared.get("reason")?;
                listener.call::<_, ()>((This(stream.clone()), reason))?;
            }
            Delivery::End { listener } => {
                let listener: Function = ends.get(listener)?;
                listener.call::<_, ()>((This(stream.clone()),))?;
            }
        }
    }

    Ok(())
}
