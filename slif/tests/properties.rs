use proptest::prelude::*;
use slif::{gen_parser, ActionRegistry, ParseOptions, Value};

const GRAMMAR: &str = r"
    expr ::= num action => num
          || expr '*' expr action => mul
          || expr '+' expr action => add
           | expr '-' expr action => sub
    num ~ [0-9]+
    :discard ~ ws
    ws ~ [\s]+
";

fn arithmetic<'a>() -> ActionRegistry<'a, Value> {
    let num = |v: &Value| v.as_f64().unwrap_or(f64::NAN);
    ActionRegistry::<'a, Value>::new()
        .bind("num", move |_, args| Value::from(num(&args[0])))
        .bind("mul", move |_, args| Value::from(num(&args[0]) * num(&args[2])))
        .bind("add", move |_, args| Value::from(num(&args[0]) + num(&args[2])))
        .bind("sub", move |_, args| Value::from(num(&args[0]) - num(&args[2])))
}

// (operands, operators) of a flat expression like 1+2*3
fn expression() -> impl Strategy<Value = (Vec<u32>, Vec<char>)> {
    (1usize..6).prop_flat_map(|n| (
        prop::collection::vec(0u32..1000, n),
        prop::collection::vec(prop::sample::select(vec!['+', '-', '*']), n - 1),
    ))
}

fn render(operands: &[u32], operators: &[char], gaps: &[String]) -> String {
    let mut out = String::new();
    let mut gap = gaps.iter().cycle();
    for (i, n) in operands.iter().enumerate() {
        out.push_str(gap.next().map_or("", |g| g.as_str()));
        out.push_str(&n.to_string());
        out.push_str(gap.next().map_or("", |g| g.as_str()));
        if let Some(op) = operators.get(i) {
            out.push(*op);
        }
    }
    out
}

proptest! {
    #[test]
    fn whitespace_is_insignificant(
        (operands, operators) in expression(),
        gaps in prop::collection::vec("[ \t\n]{0,3}", 1..8),
    ) {
        let parser = gen_parser(GRAMMAR, "arith", arithmetic(), ParseOptions::default()).unwrap();
        let compact = render(&operands, &operators, &[]);
        let spaced = render(&operands, &operators, &gaps);
        prop_assert_eq!(parser(&compact).unwrap(), parser(&spaced).unwrap());
    }

    #[test]
    fn default_values_ignore_discards(
        words in prop::collection::vec("[a-z]{1,5}", 3),
        gaps in prop::collection::vec("[ \t\n]{0,3}", 4),
    ) {
        let grammar = "s ::= word ',' word ',' word\nword ~ [a-z]+\n:discard ~ ws\nws ~ [\\s]+";
        let parser = gen_parser(grammar, "words", ActionRegistry::<Value>::new(), ParseOptions::default()).unwrap();
        let compact = words.join(",");
        let spaced = format!("{}{}{}, {}{},{}{}", gaps[0], words[0], gaps[1], words[1], gaps[2], words[2], gaps[3]);
        let value = parser(&compact).unwrap();
        prop_assert_eq!(&parser(&spaced).unwrap(), &value);
        let expected: Vec<Value> = vec![
            Value::from(words[0].as_str()), Value::from(","),
            Value::from(words[1].as_str()), Value::from(","),
            Value::from(words[2].as_str()),
        ];
        prop_assert_eq!(value, Value::List(expected));
    }

    #[test]
    fn parsing_is_deterministic(input in "[ab]{1,7}") {
        let grammar = "S ::= S S action => pair | S S S action => triple | a | b\na ~ 'a'\nb ~ 'b'";
        let actions = ActionRegistry::new()
            .bind("pair", |_, args: Vec<Value>| Value::Text(format!("({} {})", args[0], args[1])))
            .bind("triple", |_, args: Vec<Value>| Value::Text(format!("[{} {} {}]", args[0], args[1], args[2])));
        let parser = gen_parser(grammar, "ambiguous", actions, ParseOptions::default()).unwrap();
        let first = parser(&input).unwrap();
        for _ in 0..3 {
            prop_assert_eq!(&parser(&input).unwrap(), &first);
        }
    }
}
