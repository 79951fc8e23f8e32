use std::cell::RefCell;
use std::rc::Rc;

use argmatch::{ArgOrder, CommonSpec, HandlerSpec, Matcher, Outcome, Param, ProcessError, UsageError};

fn done<T>(outcome: Outcome<T>) -> T {
    match outcome {
        Outcome::Done(value) => value,
        Outcome::Help(text) => panic!("unexpected help output: {text}"),
    }
}

#[test]
fn test_empty_argv_invokes_with_all_defaults() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("serve")
                .param(Param::option("host").default("127.0.0.1"))
                .param(Param::int_option("port").default(8080))
                .param(Param::flag("verbose")),
            |args| {
                Ok((
                    args.get_str("host").unwrap().to_string(),
                    args.get_int("port").unwrap(),
                    args.get_flag("verbose"),
                ))
            },
        )
        .build()
        .unwrap();

    let (host, port, verbose) = done(
        matcher
            .process(Vec::<String>::new(), ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(host, "127.0.0.1");
    assert_eq!(port, 8080);
    assert!(!verbose);
}

#[test]
fn test_alias_equivalence_binds_the_same_slot() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("run").param(Param::flag("verbose").alias("v")),
            |args| Ok(args.get_flag("verbose")),
        )
        .build()
        .unwrap();

    assert!(done(matcher.process(["-v"], ArgOrder::Free).unwrap()));
    assert!(done(matcher.process(["--verbose"], ArgOrder::Free).unwrap()));
}

#[test]
fn test_flag_permutation_invariance() {
    let build = || {
        Matcher::builder()
            .default_help(false)
            .handler(
                HandlerSpec::new("run")
                    .param(Param::flag("all").alias("A"))
                    .param(Param::flag("brief").alias("B")),
                |args| Ok((args.get_flag("all"), args.get_flag("brief"))),
            )
            .build()
            .unwrap()
    };
    let forward = done(build().process(["-A", "-B"], ArgOrder::Free).unwrap());
    let backward = done(build().process(["-B", "-A"], ArgOrder::Free).unwrap());
    assert_eq!(forward, (true, true));
    assert_eq!(forward, backward);
}

#[test]
fn test_typed_option_rejection_names_the_option() {
    let calls = Rc::new(RefCell::new(0));
    let calls_in = calls.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("serve").param(Param::int_option("port")),
            move |_| {
                *calls_in.borrow_mut() += 1;
                Ok(())
            },
        )
        .build()
        .unwrap();

    let err = matcher
        .process(["--port=http"], ArgOrder::Free)
        .unwrap_err();
    assert_eq!(err.to_string(), "incorrect value for port");
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_furthest_progress_error_selection() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("one").exclusive().param(Param::positional("a")),
            |_| Ok(()),
        )
        .handler(
            HandlerSpec::new("two")
                .exclusive()
                .param(Param::option("mode"))
                .param(Param::positional("a"))
                .param(Param::positional("b"))
                .param(Param::positional("c")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    // "one" rejects the second token; "two" consumes all three and only
    // then misses its mandatory option. The deeper failure wins.
    let err = matcher.process(["x", "y", "z"], ArgOrder::Free).unwrap_err();
    assert_eq!(err.to_string(), "missing required option mode");
}

#[test]
fn test_tie_keeps_the_earliest_registered_handler() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("first").exclusive().param(Param::option("alpha")),
            |_| Ok(()),
        )
        .handler(
            HandlerSpec::new("second").exclusive().param(Param::option("beta")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    // Both fail without consuming anything; the first registration's
    // complaint is the one reported.
    let err = matcher
        .process(Vec::<String>::new(), ArgOrder::Free)
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required option alpha");
}

#[test]
fn test_gnu_ordering_violation_is_fatal() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("run")
                .param(Param::flag("verbose"))
                .param(Param::positional("input")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    let err = matcher
        .process(["pos1", "--verbose"], ArgOrder::Gnu)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "unexpected argument --verbose after non option arguments"
    );

    // The same line is fine under free ordering.
    assert!(matcher.process(["pos1", "--verbose"], ArgOrder::Free).is_ok());
}

#[test]
fn test_copy_scenario_binds_and_invokes_once() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let calls_in = calls.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("copy")
                .param(Param::option("source").alias("s"))
                .param(Param::flag("recursive").alias("r"))
                .param(Param::positional("destination")),
            move |args| {
                calls_in.borrow_mut().push((
                    args.get_str("source").unwrap().to_string(),
                    args.get_flag("recursive"),
                    args.get_str("destination").unwrap().to_string(),
                ));
                Ok(())
            },
        )
        .build()
        .unwrap();

    done(
        matcher
            .process(["-s", "a.txt", "-r", "out/"], ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(
        calls.borrow().as_slice(),
        &[("a.txt".to_string(), true, "out/".to_string())]
    );
}

#[test]
fn test_prefix_options_accumulate_pairs() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("build").param(Param::prefix("D")),
            |args| Ok(args.prefix_pairs("D").to_vec()),
        )
        .build()
        .unwrap();

    let pairs = done(
        matcher
            .process(["-Dkey=val", "-D", "other=x"], ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(
        pairs,
        vec![
            ("key".to_string(), Some("val".to_string())),
            ("other".to_string(), Some("x".to_string())),
        ]
    );
}

#[test]
fn test_open_keywords_capture_unknown_options() {
    let matcher = Matcher::builder()
        .default_help(false)
        .option_prefix("-")
        .handler(
            HandlerSpec::new("set")
                .param(Param::positional("target"))
                .param(Param::open_keywords()),
            |args| Ok(args.keywords().to_vec()),
        )
        .build()
        .unwrap();

    let keywords = done(
        matcher
            .process(["-color=red", "box", "-weight=3"], ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(
        keywords,
        vec![
            ("color".to_string(), Some("red".to_string())),
            ("weight".to_string(), Some("3".to_string())),
        ]
    );
}

#[test]
fn test_variadic_collects_the_tail() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("archive")
                .param(Param::positional("output"))
                .param(Param::variadic()),
            |args| {
                Ok((
                    args.get_str("output").unwrap().to_string(),
                    args.trailing().to_vec(),
                ))
            },
        )
        .build()
        .unwrap();

    let (output, rest) = done(
        matcher
            .process(["bundle.tar", "a", "b"], ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(output, "bundle.tar");
    assert_eq!(rest, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_commons_run_before_the_primary() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let order_common = order.clone();
    let order_primary = order.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .common(
            CommonSpec::new("verbosity").param(Param::flag("quiet").alias("q")),
            move |args| {
                order_common
                    .borrow_mut()
                    .push(format!("common quiet={}", args.get_flag("quiet")));
                Ok(())
            },
        )
        .handler(
            HandlerSpec::new("run").param(Param::positional("target")),
            move |args| {
                order_primary
                    .borrow_mut()
                    .push(format!("primary {}", args.get_str("target").unwrap()));
                Ok(())
            },
        )
        .build()
        .unwrap();

    done(matcher.process(["-q", "all"], ArgOrder::Free).unwrap());
    assert_eq!(
        order.borrow().as_slice(),
        &["common quiet=true".to_string(), "primary all".to_string()]
    );
}

#[test]
fn test_common_with_all_defaults_runs_even_when_unused() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_in = seen.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .common(
            CommonSpec::new("verbosity").param(Param::flag("quiet")),
            move |args| {
                seen_in.borrow_mut().push(args.get_flag("quiet"));
                Ok(())
            },
        )
        .handler(HandlerSpec::new("run"), |_| Ok(()))
        .build()
        .unwrap();

    done(
        matcher
            .process(Vec::<String>::new(), ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(seen.borrow().as_slice(), &[false]);
}

#[test]
fn test_common_with_mandatory_option_is_skipped_until_used() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_in = seen.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .common(
            CommonSpec::new("logging").param(Param::option("log-file")),
            move |args| {
                seen_in
                    .borrow_mut()
                    .push(args.get_str("log-file").unwrap().to_string());
                Ok(())
            },
        )
        .handler(HandlerSpec::new("run").param(Param::positional("target")), |_| Ok(()))
        .build()
        .unwrap();

    // Nothing for the common: it is silently skipped.
    done(matcher.process(["x"], ArgOrder::Free).unwrap());
    assert!(seen.borrow().is_empty());

    // Once it received its option, it runs.
    done(
        matcher
            .process(["--log-file=/tmp/l", "x"], ArgOrder::Free)
            .unwrap(),
    );
    assert_eq!(seen.borrow().as_slice(), &["/tmp/l".to_string()]);
}

#[test]
fn test_common_applies_pattern_limits_the_primaries() {
    let seen = Rc::new(RefCell::new(0));
    let seen_in = seen.clone();
    let matcher = Matcher::builder()
        .default_help(false)
        .common(
            CommonSpec::new("verbosity")
                .applies("run_*")
                .param(Param::flag("quiet")),
            move |_| {
                *seen_in.borrow_mut() += 1;
                Ok(())
            },
        )
        .handler(
            HandlerSpec::new("run_static").param(Param::required_flag("static")),
            |_| Ok("static"),
        )
        .handler(
            HandlerSpec::new("other").param(Param::required_flag("other")),
            |_| Ok("other"),
        )
        .build()
        .unwrap();

    assert_eq!(
        done(matcher.process(["--static", "--quiet"], ArgOrder::Free).unwrap()),
        "static"
    );
    assert_eq!(*seen.borrow(), 1);

    // The common does not apply to `other`, so `--quiet` has no taker.
    let err = matcher
        .process(["--other", "--quiet"], ArgOrder::Free)
        .unwrap_err();
    assert_eq!(err.to_string(), "unexpected argument: --quiet");
}

#[test]
fn test_exclusive_primary_gets_no_unqualified_commons() {
    let matcher = Matcher::builder()
        .default_help(false)
        .common(
            CommonSpec::new("verbosity").param(Param::flag("quiet")),
            |_| Ok(()),
        )
        .handler(
            HandlerSpec::new("wipe").exclusive().param(Param::required_flag("wipe")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    let err = matcher
        .process(["--wipe", "--quiet"], ArgOrder::Free)
        .unwrap_err();
    assert_eq!(err.to_string(), "unexpected argument: --quiet");
}

#[test]
fn test_required_flag_presence_is_checked() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("wipe")
                .param(Param::required_flag("confirm"))
                .param(Param::positional("target")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    let err = matcher.process(["disk0"], ArgOrder::Free).unwrap_err();
    assert_eq!(err.to_string(), "missing required flag confirm");
    assert!(matcher
        .process(["--confirm", "disk0"], ArgOrder::Free)
        .is_ok());
}

#[test]
fn test_rename_changes_the_public_surface_only() {
    let matcher = Matcher::builder()
        .default_help(false)
        .rename("d", "dry-run")
        .handler(
            HandlerSpec::new("sync").param(Param::flag("d")),
            |args| Ok(args.get_flag("d")),
        )
        .build()
        .unwrap();

    assert!(done(matcher.process(["--dry-run"], ArgOrder::Free).unwrap()));
    let err = matcher.process(["--d"], ArgOrder::Free).unwrap_err();
    assert!(matches!(
        err,
        ProcessError::Usage(UsageError::Unexpected { .. })
    ));
}

#[test]
fn test_engine_alias_spans_handlers() {
    let matcher = Matcher::builder()
        .default_help(false)
        .alias("p", "port")
        .handler(
            HandlerSpec::new("serve").param(Param::int_option("port").default(8080)),
            |args| Ok(args.get_int("port").unwrap()),
        )
        .build()
        .unwrap();

    assert_eq!(done(matcher.process(["-p", "9000"], ArgOrder::Free).unwrap()), 9000);
}

#[test]
fn test_help_text_matches_the_usage_formatter() {
    let matcher = Matcher::builder()
        .handler(
            HandlerSpec::new("serve")
                .doc("serve the current directory")
                .param(Param::option("host").default("127.0.0.1")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    match matcher.process(["--help"], ArgOrder::Free).unwrap() {
        Outcome::Help(text) => assert_eq!(text, matcher.usage().render()),
        Outcome::Done(_) => panic!("expected help"),
    }
}

#[test]
fn test_usage_error_reports_one_line() {
    let matcher = Matcher::builder()
        .default_help(false)
        .handler(
            HandlerSpec::new("serve").param(Param::option("host")),
            |_| Ok(()),
        )
        .build()
        .unwrap();

    let err = matcher.process(["--bogus=1"], ArgOrder::Free).unwrap_err();
    let line = err.to_string();
    assert!(!line.contains('\n'));
    assert!(line.contains("--bogus=1"));
}
