use crate::actions::{ActionRegistry, RuleContext, Semantic};
use crate::error::{Error, EvalError, ParseError};
use crate::grammar::{Action, Grammar, Semantics};
use crate::items::{BackPointer, Item, ItemRef};
use crate::parser::ParseTrees;
use crate::trace::Tracer;
use std::cmp::Reverse;

/// Evaluates one derivation out of the parse forest with the bound actions.
///
/// Ambiguity is resolved the same way every time:
/// - among completed start items: highest rank, then the rule declared
///   first, then the longest span;
/// - inside a rule application, walking its RHS right to left: the child
///   whose rule has the highest rank, then the rule declared first, then
///   the longest child.
pub struct EarleyForest<'f, 'a, V> {
    actions: &'f ActionRegistry<'a, V>,
    tracer: Option<&'f dyn Tracer>,
}

#[derive(Clone, Copy, Debug)]
enum Child {
    Lexeme { start: usize, end: usize },
    Node(ItemRef),
}

enum Task {
    Visit(ItemRef),
    Lexeme { start: usize, end: usize },
    Reduce { item: ItemRef, argc: usize },
}

enum Pending {
    Expand(ItemRef),
    Emit(Child),
}

impl<'f, 'a, V: Semantic> EarleyForest<'f, 'a, V> {
    pub fn new(actions: &'f ActionRegistry<'a, V>, tracer: Option<&'f dyn Tracer>) -> Self {
        EarleyForest{actions, tracer}
    }

    /*
    ## S -> S + N | N
    ## "1 + 2"
    The completed item `S -> S + N.` has a Complete back-pointer whose
    trigger is `N -> [0-9].` and whose source is `S -> S + .N`; following
    sources right to left yields the children of the rule, triggers are
    evaluated as nodes of their own.
    */
    pub fn eval(&self, trees: &ParseTrees) -> Result<V, Error> {
        let root = self.choose_root(trees).ok_or(ParseError::IncompleteParse)?;
        let mut tasks = vec![Task::Visit(root)];
        let mut values: Vec<V> = Vec::new();
        while let Some(task) = tasks.pop() {
            match task {
                Task::Visit(item) => {
                    let leaves = self.leaves(trees, item);
                    tasks.push(Task::Reduce{item, argc: leaves.len()});
                    for leaf in leaves.into_iter().rev() {
                        tasks.push(match leaf {
                            Child::Lexeme{start, end} => Task::Lexeme{start, end},
                            Child::Node(child) => Task::Visit(child),
                        });
                    }
                }
                Task::Lexeme{start, end} => values.push(V::from_lexeme(&trees.input[start..end])),
                Task::Reduce{item, argc} => {
                    let args = values.split_off(values.len() - argc);
                    let value = self.reduce(trees, item, args)?;
                    values.push(value);
                }
            }
        }
        values.pop().ok_or_else(|| ParseError::IncompleteParse.into())
    }

    fn choose_root(&self, trees: &ParseTrees) -> Option<ItemRef> {
        let g1 = trees.grammar.g1();
        trees.roots().iter().copied().min_by_key(|root| {
            let rule_id = trees.item(*root).rule;
            (Reverse(g1.rule(rule_id).rank), rule_id, Reverse(root.set))
        })
    }

    fn choose(&self, trees: &ParseTrees, item: &Item) -> Option<BackPointer> {
        let g1 = trees.grammar.g1();
        item.sources().iter().copied().min_by_key(|bp| match bp {
            BackPointer::Complete{source, trigger} => {
                let rule_id = trees.item(*trigger).rule;
                (Reverse(g1.rule(rule_id).rank), rule_id, source.set)
            }
            BackPointer::Scan{start, ..} => (Reverse(0), 0, *start),
        })
    }

    // children of a rule application, left to right, masked
    fn children(&self, trees: &ParseTrees, item: ItemRef) -> Vec<Child> {
        let g1 = trees.grammar.g1();
        let rule = g1.rule(trees.item(item).rule);
        let mut children = Vec::new();
        let mut cursor = item;
        loop {
            let current = trees.item(cursor);
            let bp = match (current.dot, self.choose(trees, current)) {
                (0, _) | (_, None) => break,
                (_, Some(bp)) => bp,
            };
            let pos = current.dot - 1;
            if rule.keeps(pos) {
                children.push(match bp {
                    BackPointer::Complete{trigger, ..} => Child::Node(trigger),
                    BackPointer::Scan{start, ..} => Child::Lexeme{start, end: cursor.set},
                });
            }
            cursor = bp.source();
        }
        children.reverse();
        children
    }

    // children with those of spliced rules inlined
    fn leaves(&self, trees: &ParseTrees, item: ItemRef) -> Vec<Child> {
        let g1 = trees.grammar.g1();
        let mut leaves = Vec::new();
        let mut pending = vec![Pending::Expand(item)];
        while let Some(next) = pending.pop() {
            match next {
                Pending::Expand(at) => {
                    for child in self.children(trees, at).into_iter().rev() {
                        pending.push(match child {
                            Child::Node(c) if g1.rule(trees.item(c).rule).is_splice() => Pending::Expand(c),
                            other => Pending::Emit(other),
                        });
                    }
                }
                Pending::Emit(child) => leaves.push(child),
            }
        }
        leaves
    }

    fn reduce(&self, trees: &ParseTrees, at: ItemRef, mut args: Vec<V>) -> Result<V, Error> {
        let grammar: &Grammar = trees.grammar;
        let item = trees.item(at);
        let rule = grammar.g1().rule(item.rule);
        if rule.is_splice() {
            // only reached for a spliced start rule
            return Ok(match args.len() {
                1 => args.remove(0),
                _ => V::from_list(args),
            });
        }
        let start = trees.skip(item.origin).min(at.set);
        let ctx = RuleContext{
            name: &rule.name,
            rule,
            start,
            end: at.set,
            text: &trees.input[start..at.set],
        };
        let action = match &rule.semantics {
            Semantics::Apply(Some(action)) => Some(action),
            _ => grammar.default_action(),
        };
        let value = match action {
            Some(Action::Named(name)) => match self.actions.get(name) {
                Some(f) => f(&ctx, args),
                None => return Err(EvalError::UnboundAction(name.clone()).into()),
            },
            Some(Action::First) => args.into_iter().next().unwrap_or_else(V::undefined),
            Some(Action::Undef) => V::undefined(),
            Some(Action::Array) => V::from_list(args),
            // args hold the lexemes' own text, discards between them are not part of it
            None if !rule.rhs.is_empty() && rule.rhs.iter().all(|s| grammar.is_lexeme(*s)) =>
                match args.len() {
                    1 => args.remove(0),
                    _ => V::from_list(args),
                },
            None => V::undefined(),
        };
        if let Some(tracer) = self.tracer {
            tracer.value(&ctx, &value);
        }
        Ok(value)
    }
}
