#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use weft_reactive::{EffectOptions, ObjectRef, Runtime, Value};

#[derive(Arbitrary, Debug)]
enum Op {
    Push(i8),
    Pop,
    Shift,
    Unshift(i8),
    Splice { start: u8, delete: u8, item: Option<i8> },
    SetLen(u8),
    Set(u8, i8),
    Flush,
}

fn apply_model(model: &mut Vec<Value>, op: &Op) {
    match *op {
        Op::Push(v) => model.push(Value::from(i32::from(v))),
        Op::Pop => {
            model.pop();
        }
        Op::Shift => {
            if !model.is_empty() {
                model.remove(0);
            }
        }
        Op::Unshift(v) => model.insert(0, Value::from(i32::from(v))),
        Op::Splice {
            start,
            delete,
            item,
        } => {
            let start = usize::from(start).min(model.len());
            let end = start + usize::from(delete).min(model.len() - start);
            model.splice(start..end, item.map(|v| Value::from(i32::from(v))));
        }
        Op::SetLen(n) => model.resize(usize::from(n % 32), Value::Null),
        Op::Set(i, v) => {
            let i = usize::from(i % 32);
            if i >= model.len() {
                model.resize(i, Value::Null);
                model.push(Value::from(i32::from(v)));
            } else {
                model[i] = Value::from(i32::from(v));
            }
        }
        Op::Flush => {}
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let rt = Runtime::new();
    let list = rt.reactive(&ObjectRef::sequence(Vec::<Value>::new()));
    let mut model: Vec<Value> = Vec::new();

    let eager_len = Rc::new(Cell::new(usize::MAX));
    let (l, out) = (list.clone(), Rc::clone(&eager_len));
    rt.effect(move || out.set(l.len()));

    let deferred_len = Rc::new(Cell::new(usize::MAX));
    let (l, out) = (list.clone(), Rc::clone(&deferred_len));
    rt.effect_with(
        move || out.set(l.len()),
        EffectOptions::default().scheduler(rt.deferred_scheduler()),
    );

    let l = list.clone();
    let len = rt.computed(move || l.len());

    for op in ops.iter().take(256) {
        apply_model(&mut model, op);
        match *op {
            Op::Push(v) => {
                list.push(i32::from(v));
            }
            Op::Pop => {
                list.pop();
            }
            Op::Shift => {
                list.shift();
            }
            Op::Unshift(v) => {
                list.unshift([Value::from(i32::from(v))]);
            }
            Op::Splice {
                start,
                delete,
                item,
            } => {
                list.splice(
                    usize::from(start),
                    usize::from(delete),
                    item.map(|v| Value::from(i32::from(v))),
                );
            }
            Op::SetLen(n) => {
                list.set_len(usize::from(n % 32));
            }
            Op::Set(i, v) => {
                list.set(usize::from(i % 32), i32::from(v));
            }
            Op::Flush => {
                rt.flush().expect("length readers never enqueue jobs");
                assert_eq!(deferred_len.get(), model.len());
            }
        }

        let raw = list.raw().borrow().as_sequence().cloned().unwrap_or_default();
        assert_eq!(raw, model, "after {op:?}");
        assert_eq!(eager_len.get(), model.len());
        assert_eq!(len.get(), model.len());
    }
});
