//! End-to-end scenarios and cross-module testable properties.
//!
//! Each scenario builds a small `ast::File` by hand (the shape a checked
//! parser would hand this crate) and runs it through the full
//! `gen_package` pipeline end to end, rather than exercising one function
//! in isolation.

use wuffs_cgen::ast::{
    Arg, Const, Expr, Field, File, Func, Interner, IoBindTarget, Op, Statement, StatusDecl,
    StatusKeyword, StructDecl, Use, VarDecl,
};
use wuffs_cgen::config::GenConfig;
use wuffs_cgen::error::GenError;
use wuffs_cgen::gen_package;
use wuffs_cgen::status::{decode_status_code, encode_status_code};
use wuffs_cgen::types::TypeExpr;

fn empty_file(package: &str, interner: Interner) -> File {
    File {
        package: package.to_string(),
        interner,
        uses: vec![],
        consts: vec![],
        statuses: vec![],
        structs: vec![],
        funcs: vec![],
    }
}

/// S1: a plain, non-coroutine free function compiles to a single header +
/// implementation region, with no suspend/resume machinery at all.
#[test]
fn s1_plain_function_has_no_coroutine_scaffolding() {
    let mut interner = Interner::new();
    let name = interner.intern("double_it");
    let x = interner.intern("x");

    let func = Func {
        name,
        receiver: None,
        public: true,
        coroutine: false,
        args: vec![Arg {
            name: x,
            ty: TypeExpr::U32,
            refinement: None,
        }],
        ret: TypeExpr::U32,
        locals: vec![],
        body: vec![Statement::Ret {
            value: Expr::Binary(Op::Add, Box::new(Expr::Arg(x)), Box::new(Expr::Arg(x))),
            is_yield: false,
        }],
    };
    let mut file = empty_file("arith", interner);
    file.funcs.push(func);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("#if defined(WUFFS_IMPLEMENTATION)"));
    assert!(out.contains("wuffs_arith__double_it"));
    assert!(out.contains("a_x"));
    assert!(!out.contains("coro_susp_point"));
    assert!(!out.contains("switch"));
}

/// S2: a classy struct with one coroutine method that calls the
/// suspendible `read_u8?` built-in gets a private suspension frame and a
/// resume switch with a `goto suspend` slow path.
#[test]
fn s2_coroutine_method_with_suspending_read_gets_resume_switch() {
    let mut interner = Interner::new();
    let decoder = interner.intern("decoder");
    let decode = interner.intern("decode");
    let src = interner.intern("src");
    let read_u8 = interner.intern("read_u8");
    let b = interner.intern("b");
    // The slug a `StatusLiteral` looks up must equal `cify_message` of the
    // declared status' own message, so this interned string has to match
    // the cified form of "bad header" exactly.
    let bad_header_slug = interner.intern("bad_header");

    let struct_decl = StructDecl {
        name: decoder,
        public: true,
        classy: true,
        fields: vec![],
    };

    let func = Func {
        name: decode,
        receiver: Some(decoder),
        public: true,
        coroutine: true,
        args: vec![Arg {
            name: src,
            ty: TypeExpr::IoReader,
            refinement: None,
        }],
        ret: TypeExpr::Status,
        locals: vec![VarDecl {
            name: b,
            ty: TypeExpr::U8,
        }],
        body: vec![
            Statement::Var {
                name: b,
                ty: TypeExpr::U8,
                init: Some(Expr::MethodCall {
                    receiver: Box::new(Expr::Arg(src)),
                    method: read_u8,
                    args: vec![],
                    coroutine: true,
                }),
            },
            Statement::Ret {
                value: Expr::StatusLiteral(bad_header_slug),
                is_yield: false,
            },
        ],
    };

    let mut file = empty_file("gif", interner);
    file.statuses.push(StatusDecl {
        keyword: StatusKeyword::Error,
        message: "bad header".to_string(),
    });
    file.structs.push(struct_decl);
    file.funcs.push(func);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("coro_susp_point"));
    assert!(out.contains("goto suspend;"));
    assert!(out.contains("if (iop_a_src < io1_a_src)"));
    assert!(out.contains("struct {") && out.contains("decode"));
}

/// S3: cyclic struct field dependencies are rejected before any emission
/// is attempted.
#[test]
fn s3_cyclic_structs_are_rejected() {
    let mut interner = Interner::new();
    let a_name = interner.intern("a");
    let b_name = interner.intern("b");
    let f = interner.intern("f");

    let a = StructDecl {
        name: a_name,
        public: true,
        classy: false,
        fields: vec![Field {
            name: f,
            ty: TypeExpr::Named {
                pkg: None,
                name: "b".to_string(),
            },
        }],
    };
    let b = StructDecl {
        name: b_name,
        public: true,
        classy: false,
        fields: vec![Field {
            name: f,
            ty: TypeExpr::Named {
                pkg: None,
                name: "a".to_string(),
            },
        }],
    };

    let mut file = empty_file("cyc", interner);
    file.structs.push(a);
    file.structs.push(b);

    let err = gen_package(&file, GenConfig::new()).unwrap_err();
    assert!(matches!(err, GenError::CyclicStructs { .. }));
}

/// S4: declared statuses are numbered in declaration order per sign, and
/// the macros embedded in the header carry the matching 32-bit codes.
#[test]
fn s4_status_declarations_number_and_encode_correctly() {
    let mut file = empty_file("vp8", Interner::new());
    file.statuses.push(StatusDecl {
        keyword: StatusKeyword::Error,
        message: "bad header".to_string(),
    });
    file.statuses.push(StatusDecl {
        keyword: StatusKeyword::Suspension,
        message: "short read".to_string(),
    });

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("WUFFS_VP8__ERROR_BAD_HEADER"));
    assert!(out.contains("WUFFS_VP8__SUSPENSION_SHORT_READ"));

    let pkg_id = wuffs_cgen::status::package_id("vp8").unwrap();
    let error_code = encode_status_code(pkg_id, true, 1);
    let (decoded_pkg, is_error, magnitude) = decode_status_code(error_code);
    assert_eq!(decoded_pkg, pkg_id);
    assert!(is_error);
    assert_eq!(magnitude, 1);
}

/// S5: a local that is read only after a suspension point (`yield`) is
/// `Strong`-resumable and gets a field in the struct's private suspension
/// frame, addressed through `self->private_impl.p.<method>.<local>`.
#[test]
fn s5_resumable_local_gets_a_private_suspension_frame_field() {
    let mut interner = Interner::new();
    let recv = interner.intern("codec");
    let run = interner.intern("run");
    let counter = interner.intern("counter");

    let struct_decl = StructDecl {
        name: recv,
        public: true,
        classy: true,
        fields: vec![],
    };

    let func = Func {
        name: run,
        receiver: Some(recv),
        public: true,
        coroutine: true,
        args: vec![],
        ret: TypeExpr::Status,
        locals: vec![VarDecl {
            name: counter,
            ty: TypeExpr::U32,
        }],
        body: vec![
            Statement::Var {
                name: counter,
                ty: TypeExpr::U32,
                init: Some(Expr::IntLiteral(0)),
            },
            Statement::Ret {
                value: Expr::BoolLiteral(true),
                is_yield: true,
            },
            Statement::ExprStmt(Expr::Local(counter)),
            Statement::Ret {
                value: Expr::BoolLiteral(false),
                is_yield: false,
            },
        ],
    };

    let mut file = empty_file("p", interner);
    file.structs.push(struct_decl);
    file.funcs.push(func);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("self->private_impl.p.run.counter"));
    assert!(out.contains("uint32_t counter"));
}

/// S6: an `io_bind` scope saves and restores the rebound `io_buffer`
/// around its body, balanced (one save, one restore per nesting level).
#[test]
fn s6_io_bind_saves_and_restores_the_buffer() {
    let mut interner = Interner::new();
    let f = interner.intern("scoped");
    let v = interner.intern("v");
    let src = interner.intern("src");

    let func = Func {
        name: f,
        receiver: None,
        public: true,
        coroutine: false,
        args: vec![Arg {
            name: src,
            ty: TypeExpr::IoReader,
            refinement: None,
        }],
        ret: TypeExpr::Status,
        locals: vec![VarDecl {
            name: v,
            ty: TypeExpr::IoReader,
        }],
        body: vec![Statement::IoBind {
            var: v,
            target: IoBindTarget::Stream(Expr::Arg(src)),
            body: vec![Statement::Ret {
                value: Expr::BoolLiteral(true),
                is_yield: false,
            }],
        }],
    };

    let mut file = empty_file("p", interner);
    file.funcs.push(func);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("io_bind_backup_0"));
    let save_count = out.matches("io_bind_backup_0").count();
    assert!(save_count >= 2, "expected both a save and a restore reference");
}

/// A classy struct field of another classy struct's type gets its own
/// `__check_wuffs_version` call, recursively, from the enclosing struct's
/// initializer, with status propagated on failure.
#[test]
fn nested_classy_field_gets_a_recursive_check_wuffs_version_call() {
    let mut interner = Interner::new();
    let inner = interner.intern("inner");
    let outer = interner.intern("outer");
    let sub = interner.intern("sub");

    let inner_decl = StructDecl {
        name: inner,
        public: true,
        classy: true,
        fields: vec![],
    };
    let outer_decl = StructDecl {
        name: outer,
        public: true,
        classy: true,
        fields: vec![Field {
            name: sub,
            ty: TypeExpr::Named {
                pkg: None,
                name: "inner".to_string(),
            },
        }],
    };

    let mut file = empty_file("nest", interner);
    file.structs.push(inner_decl);
    file.structs.push(outer_decl);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert!(out.contains("wuffs_nest__inner__check_wuffs_version(&self->private_impl.f_sub, sizeof(self->private_impl.f_sub), wuffs_version)"));
    assert!(out.contains("wuffs_base__status__is_error"));
}

/// An `iterate` round with `unroll > 1` duplicates its body that many
/// times per outer loop pass, each copy over its own subslice.
#[test]
fn iterate_with_unroll_duplicates_the_round_body() {
    use wuffs_cgen::ast::IterateRound;

    let mut interner = Interner::new();
    let f = interner.intern("sum_pairs");
    let arr = interner.intern("arr");
    let elem = interner.intern("elem");

    let func = Func {
        name: f,
        receiver: None,
        public: true,
        coroutine: false,
        args: vec![Arg {
            name: arr,
            ty: TypeExpr::Slice {
                elem: Box::new(TypeExpr::U8),
                read_only: true,
            },
            refinement: None,
        }],
        ret: TypeExpr::Status,
        locals: vec![],
        body: vec![Statement::Iterate {
            var: elem,
            array: Expr::Arg(arr),
            rounds: vec![IterateRound {
                length: 2,
                unroll: 4,
                body: vec![Statement::ExprStmt(Expr::Local(elem))],
            }],
            label: None,
        }],
    };

    let mut file = empty_file("roll", interner);
    file.funcs.push(func);

    let out = gen_package(&file, GenConfig::new()).unwrap();
    // 4 unrolled per-element subslices plus 1 to advance `remaining`.
    assert_eq!(out.matches("wuffs_base__slice_u8__subslice_ij").count(), 5);
    assert!(out.contains("iter_elem_remaining"));
}

/// Property 1 (round-trip): encoding then decoding a status code recovers
/// the original package id, sign, and magnitude, for every sign/magnitude
/// combination that can occur in a real package.
#[test]
fn property_status_code_round_trips() {
    let pkg_id = wuffs_cgen::status::package_id("gif").unwrap();
    for is_error in [true, false] {
        for magnitude in [0u8, 1, 42, 127] {
            let code = encode_status_code(pkg_id, is_error, magnitude);
            let (decoded_pkg, decoded_err, decoded_mag) = decode_status_code(code);
            assert_eq!(decoded_pkg, pkg_id);
            assert_eq!(decoded_err, is_error);
            assert_eq!(decoded_mag, magnitude);
        }
    }
}

/// Property 2 (round-trip): a `File` serialized to the JSON wire format
/// and deserialized back, after `Interner::rehash`, generates
/// byte-identical output to generating straight from the original value.
#[test]
fn property_json_ast_round_trips_through_generation() {
    let mut interner = Interner::new();
    let name = interner.intern("noop");
    let func = Func {
        name,
        receiver: None,
        public: true,
        coroutine: false,
        args: vec![],
        ret: TypeExpr::Status,
        locals: vec![],
        body: vec![Statement::Ret {
            value: Expr::BoolLiteral(true),
            is_yield: false,
        }],
    };
    let mut file = empty_file("rt", interner);
    file.funcs.push(func);

    let direct = gen_package(&file, GenConfig::new()).unwrap();

    let json = serde_json::to_string(&file).unwrap();
    let mut restored: File = serde_json::from_str(&json).unwrap();
    restored.interner.rehash();
    let via_json = gen_package(&restored, GenConfig::new()).unwrap();

    assert_eq!(direct, via_json);
}

/// Property 3 (per-function invariant): the temporary pool is always
/// balanced at the end of a successful generation, for a function with
/// more than one coroutine call in sequence.
#[test]
fn property_temp_pool_balances_across_multiple_suspending_calls() {
    let mut interner = Interner::new();
    let recv = interner.intern("r");
    let run = interner.intern("run");
    let src = interner.intern("src");
    let read_u8 = interner.intern("read_u8");
    let a = interner.intern("a");
    let b_local = interner.intern("b");

    let struct_decl = StructDecl {
        name: recv,
        public: true,
        classy: true,
        fields: vec![],
    };
    let func = Func {
        name: run,
        receiver: Some(recv),
        public: true,
        coroutine: true,
        args: vec![Arg {
            name: src,
            ty: TypeExpr::IoReader,
            refinement: None,
        }],
        ret: TypeExpr::Status,
        locals: vec![
            VarDecl {
                name: a,
                ty: TypeExpr::U8,
            },
            VarDecl {
                name: b_local,
                ty: TypeExpr::U8,
            },
        ],
        body: vec![
            Statement::Var {
                name: a,
                ty: TypeExpr::U8,
                init: Some(Expr::MethodCall {
                    receiver: Box::new(Expr::Arg(src)),
                    method: read_u8,
                    args: vec![],
                    coroutine: true,
                }),
            },
            Statement::Var {
                name: b_local,
                ty: TypeExpr::U8,
                init: Some(Expr::MethodCall {
                    receiver: Box::new(Expr::Arg(src)),
                    method: read_u8,
                    args: vec![],
                    coroutine: true,
                }),
            },
            Statement::Ret {
                value: Expr::BoolLiteral(true),
                is_yield: false,
            },
        ],
    };

    let mut file = empty_file("p", interner);
    file.structs.push(struct_decl);
    file.funcs.push(func);

    // `gen_package` itself calls `check_temp_pool_balanced` per function;
    // success here is the assertion.
    let out = gen_package(&file, GenConfig::new()).unwrap();
    assert_eq!(out.matches("case 1:").count(), 1);
    assert_eq!(out.matches("case 2:").count(), 1);
}

/// Ordering guarantee: the public header region always precedes the
/// `WUFFS_IMPLEMENTATION`-guarded private region, and every `#ifndef`
/// include guard this package opens is closed exactly once.
#[test]
fn property_header_precedes_implementation_region() {
    let interner = Interner::new();
    let file = empty_file("ord", interner);
    let out = gen_package(&file, GenConfig::new()).unwrap();

    let guard_pos = out.find("#ifndef WUFFS_INCLUDE_GUARD__ORD").unwrap();
    let impl_pos = out.find("#if defined(WUFFS_IMPLEMENTATION)").unwrap();
    assert!(guard_pos < impl_pos);
    assert_eq!(out.matches("#ifndef WUFFS_INCLUDE_GUARD__ORD").count(), 1);
    assert_eq!(out.matches("#endif  // WUFFS_INCLUDE_GUARD__ORD").count(), 1);
}

/// A package with a `use` inlines the used package's previously generated
/// header, stripped of its own base-public region, and still emits its
/// own public `const`-bearing content; a `use` with no supplied header is
/// rejected rather than silently skipped.
#[test]
fn package_with_use_generates_with_the_used_header_inlined() {
    let mut interner = Interner::new();
    let name = interner.intern("limit");
    let file = File {
        package: "aux".to_string(),
        interner,
        uses: vec![Use {
            path: "base38".to_string(),
        }],
        consts: vec![Const {
            name,
            public: true,
            ty: TypeExpr::U32,
            value: Expr::IntLiteral(16),
        }],
        statuses: vec![],
        structs: vec![],
        funcs: vec![],
    };

    assert!(matches!(
        gen_package(&file, GenConfig::new()).unwrap_err(),
        GenError::MissingUsedHeader { .. }
    ));

    let mut used_header = String::new();
    used_header.push_str("#ifndef WUFFS_INCLUDE_GUARD__BASE38\n");
    used_header.push_str(wuffs_cgen::base_impl::base_public_header());
    used_header.push_str("typedef struct wuffs_base38__codec__struct wuffs_base38__codec;\n");
    used_header.push_str("#endif  // WUFFS_INCLUDE_GUARD__BASE38\n");
    let config = GenConfig::new().with_used_header("base38", used_header);

    let out = gen_package(&file, config).unwrap();
    assert!(out.contains("wuffs_base38__codec"));
    assert_eq!(
        out.matches(wuffs_cgen::base_impl::BASE_PUBLIC_BEGIN).count(),
        1
    );
}
