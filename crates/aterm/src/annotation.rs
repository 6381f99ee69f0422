//! Annotations attach label and value pairs to a term, without changing the
//! term that they annotate.
//!
//! An annotated term is stored as `<annotated>(t, l)` where `t` is the term
//! without annotations and `l` is a non-empty list of `<annotation>(label,
//! value)` terms in insertion order. Removing all annotations yields `t` again.

#![forbid(unsafe_code)]

use crate::ATerm;
use crate::ATermList;
use crate::ATermRef;
use crate::Term;

/// Returns true iff the term has at least one annotation.
pub fn is_annotated<'a, 'b>(term: &'b impl Term<'a, 'b>) -> bool {
    term.get_head_symbol() == term.pool().annotated_symbol()
}

/// Returns the term without any of its annotations.
pub fn remove_annotations<'a, 'b>(term: &'b impl Term<'a, 'b>) -> ATerm {
    split(term.copy()).0.protect()
}

/// Returns the value of the annotation with the given label.
pub fn get_annotation<'a, 'b, 'c, 'd>(
    term: &'b impl Term<'a, 'b>,
    label: &'d impl Term<'c, 'd>,
) -> Option<ATermRef<'a>> {
    let label = label.copy();
    split(term.copy())
        .1
        .into_iter()
        .find(|annotation| annotation.arg(0) == label)
        .map(|annotation| annotation.arg(1))
}

/// Returns the term with the annotation `label` set to `value`, replacing the
/// previous value of that label.
pub fn set_annotation<'a, 'b, 'c, 'd, 'e, 'f>(
    term: &'b impl Term<'a, 'b>,
    label: &'d impl Term<'c, 'd>,
    value: &'f impl Term<'e, 'f>,
) -> ATerm {
    let pool = term.pool();
    let (base, annotations) = split(term.copy());
    let entry = pool.create_term(&pool.annotation_symbol(), &[label.copy(), value.copy()]);

    let mut replaced = false;
    let mut entries: Vec<ATerm> = annotations
        .into_iter()
        .map(|annotation| {
            if annotation.arg(0) == label.copy() {
                replaced = true;
                entry.clone()
            } else {
                annotation.protect()
            }
        })
        .collect();

    if !replaced {
        entries.push(entry);
    }

    annotate(base, entries)
}

/// Returns the term without the annotation with the given label.
pub fn remove_annotation<'a, 'b, 'c, 'd>(term: &'b impl Term<'a, 'b>, label: &'d impl Term<'c, 'd>) -> ATerm {
    let label = label.copy();
    let (base, annotations) = split(term.copy());

    let entries: Vec<ATerm> = annotations
        .into_iter()
        .filter(|annotation| annotation.arg(0) != label)
        .map(|annotation| annotation.protect())
        .collect();

    annotate(base, entries)
}

/// Splits a term into the term without annotations and its annotations.
fn split(term: ATermRef<'_>) -> (ATermRef<'_>, Vec<ATermRef<'_>>) {
    if !is_annotated(&term) {
        return (term, Vec::new());
    }

    let mut annotations = Vec::new();
    let mut list = term.arg(1);
    while list.arguments().len() == 2 {
        annotations.push(list.arg(0));
        list = list.arg(1);
    }

    (term.arg(0), annotations)
}

/// Creates the annotated term, or the base term itself when there are no annotations.
fn annotate(base: ATermRef<'_>, entries: Vec<ATerm>) -> ATerm {
    if entries.is_empty() {
        return base.protect();
    }

    let pool = base.pool();
    let list = ATermList::from_double_iter(pool, entries.into_iter());
    pool.create_term(&pool.annotated_symbol(), &[base.protect(), list.into()])
}
