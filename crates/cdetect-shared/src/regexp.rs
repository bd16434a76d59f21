//! Small regular expression engine.
//!
//! Supported syntax: literals, `.`, the classes `\d`, `\s`, `\w`, escaped
//! characters (`\\`, `\.`, `\(`...), the postfix quantifiers `?`, `*`, `+`,
//! alternation with `|` and grouping with `(...)`.
//!
//! Patterns compile to an NFA whose states live in a single arena and refer
//! to each other by index, so loops created by `*` and `+` need no special
//! care when the automaton is dropped.

use thiserror::Error;

type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Lambda,
    Any,
    Literal(char),
    Digit,
    Space,
    Word,
}

impl Edge {
    fn accepts(self, c: char) -> bool {
        match self {
            Edge::Lambda => false,
            Edge::Any => true,
            Edge::Literal(expected) => expected == c,
            Edge::Digit => c.is_ascii_digit(),
            Edge::Space => c.is_whitespace(),
            Edge::Word => c.is_alphanumeric() || c == '_',
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    edge: Edge,
    target: StateId,
}

#[derive(Debug, Clone, Default)]
struct State {
    transitions: Vec<Transition>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegexError {
    #[error("unbalanced parenthesis at offset {0}")]
    UnbalancedParenthesis(usize),

    #[error("pattern ends with a lone backslash")]
    DanglingEscape,

    #[error("quantifier '{quantifier}' at offset {offset} has nothing to repeat")]
    MissingOperand { quantifier: char, offset: usize },
}

/// Position in the pattern. Copied into every recursive call and handed back
/// with the fragment it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    pos: usize,
}

impl Cursor {
    fn peek(self, pattern: &[char]) -> Option<char> {
        pattern.get(self.pos).copied()
    }

    fn advance(self) -> Cursor {
        Cursor { pos: self.pos + 1 }
    }
}

/// Entry and exit states of a partially built automaton.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    start: StateId,
    end: StateId,
}

#[derive(Debug, Default)]
struct Builder {
    states: Vec<State>,
}

impl Builder {
    fn state(&mut self) -> StateId {
        self.states.push(State::default());
        self.states.len() - 1
    }

    fn connect(&mut self, from: StateId, edge: Edge, target: StateId) {
        self.states[from].transitions.push(Transition { edge, target });
    }

    fn atom(&mut self, edge: Edge) -> Fragment {
        let fragment = Fragment {
            start: self.state(),
            end: self.state(),
        };
        self.connect(fragment.start, edge, fragment.end);
        fragment
    }

    /// `branch ('|' branch)*`, every branch wired into one shared final state.
    fn alternation(
        &mut self,
        pattern: &[char],
        cursor: Cursor,
        depth: usize,
    ) -> Result<(Fragment, Cursor), RegexError> {
        let fragment = Fragment {
            start: self.state(),
            end: self.state(),
        };
        let mut cursor = cursor;
        loop {
            let (branch, next) = self.sequence(pattern, cursor, depth)?;
            self.connect(fragment.start, Edge::Lambda, branch.start);
            self.connect(branch.end, Edge::Lambda, fragment.end);
            cursor = next;
            if cursor.peek(pattern) == Some('|') {
                cursor = cursor.advance();
            } else {
                return Ok((fragment, cursor));
            }
        }
    }

    fn sequence(
        &mut self,
        pattern: &[char],
        cursor: Cursor,
        depth: usize,
    ) -> Result<(Fragment, Cursor), RegexError> {
        let start = self.state();
        let mut end = start;
        let mut last: Option<Fragment> = None;
        let mut cursor = cursor;

        while let Some(c) = cursor.peek(pattern) {
            let atom = match c {
                '|' => break,
                ')' if depth > 0 => break,
                ')' => return Err(RegexError::UnbalancedParenthesis(cursor.pos)),
                '?' | '*' | '+' => {
                    let Some(operand) = last else {
                        return Err(RegexError::MissingOperand {
                            quantifier: c,
                            offset: cursor.pos,
                        });
                    };
                    if c != '+' {
                        self.connect(operand.start, Edge::Lambda, operand.end);
                    }
                    if c != '?' {
                        self.connect(operand.end, Edge::Lambda, operand.start);
                    }
                    cursor = cursor.advance();
                    continue;
                }
                '(' => {
                    let open = cursor.pos;
                    let (group, next) = self.alternation(pattern, cursor.advance(), depth + 1)?;
                    if next.peek(pattern) != Some(')') {
                        return Err(RegexError::UnbalancedParenthesis(open));
                    }
                    cursor = next.advance();
                    group
                }
                '\\' => {
                    let escaped = cursor
                        .advance()
                        .peek(pattern)
                        .ok_or(RegexError::DanglingEscape)?;
                    cursor = cursor.advance().advance();
                    self.atom(match escaped {
                        'd' => Edge::Digit,
                        's' => Edge::Space,
                        'w' => Edge::Word,
                        other => Edge::Literal(other),
                    })
                }
                '.' => {
                    cursor = cursor.advance();
                    self.atom(Edge::Any)
                }
                literal => {
                    cursor = cursor.advance();
                    self.atom(Edge::Literal(literal))
                }
            };
            self.connect(end, Edge::Lambda, atom.start);
            end = atom.end;
            last = Some(atom);
        }

        Ok((Fragment { start, end }, cursor))
    }
}

/// Compiled pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    states: Vec<State>,
    start: StateId,
    accept: StateId,
}

impl Regex {
    pub fn new(pattern: &str) -> Result<Self, RegexError> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut builder = Builder::default();
        let (fragment, cursor) = builder.alternation(&chars, Cursor { pos: 0 }, 0)?;
        if cursor.pos != chars.len() {
            return Err(RegexError::UnbalancedParenthesis(cursor.pos));
        }
        log::trace!(
            "Compiled pattern {pattern:?} into {} states",
            builder.states.len()
        );
        Ok(Regex {
            pattern: pattern.to_string(),
            states: builder.states,
            start: fragment.start,
            accept: fragment.end,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Anchored at the start only: `text` matches as long as some path of
    /// the automaton survives the whole input, whether or not that path has
    /// reached the final state. `"ab"` therefore matches the text `"a"`.
    pub fn is_match(&self, text: &str) -> bool {
        self.simulate(text).is_some()
    }

    /// Like [`Regex::is_match`] but the final state must be reached once the
    /// whole input is consumed.
    pub fn is_full_match(&self, text: &str) -> bool {
        self.simulate(text)
            .is_some_and(|frontier| frontier[self.accept])
    }

    /// Runs the automaton over `text` and returns the closed frontier left
    /// after the last character, or `None` once the frontier empties.
    fn simulate(&self, text: &str) -> Option<Vec<bool>> {
        let mut present = vec![false; self.states.len()];
        let mut future = vec![false; self.states.len()];
        present[self.start] = true;

        for c in text.chars() {
            self.close(&mut present);
            future.iter_mut().for_each(|state| *state = false);
            let mut alive = false;
            for (id, _) in present.iter().enumerate().filter(|(_, active)| **active) {
                for transition in &self.states[id].transitions {
                    if transition.edge.accepts(c) {
                        future[transition.target] = true;
                        alive = true;
                    }
                }
            }
            if !alive {
                return None;
            }
            std::mem::swap(&mut present, &mut future);
        }

        self.close(&mut present);
        Some(present)
    }

    /// Extends `frontier` with every state reachable through lambda edges.
    fn close(&self, frontier: &mut [bool]) {
        let mut pending: Vec<StateId> = frontier
            .iter()
            .enumerate()
            .filter_map(|(id, active)| active.then_some(id))
            .collect();
        while let Some(id) = pending.pop() {
            for transition in &self.states[id].transitions {
                if transition.edge == Edge::Lambda && !frontier[transition.target] {
                    frontier[transition.target] = true;
                    pending.push(transition.target);
                }
            }
        }
    }
}
