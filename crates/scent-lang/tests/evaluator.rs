//! End-to-end evaluator tests: complete sources in, canonical assembly
//! text (or an error of the right kind) out.

use scent_core::ErrorKind;
use scent_lang::testing::*;

const INCREMENTAL_PAGE: &str =
    "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream begin_page\n";

macro_rules! evaluator_error_tests {
    ( $( ($name: ident, $body: expr, $kind: expr), )+ ) => {
        $(
        #[test]
        fn $name() {
            let err = run_err($body);
            assert_eq![err.kind, $kind, "unexpected error: {err}"];
        }
        )+
    };
}

// ---------------------------------------------------------------------
// Stack, groups, arrays, names.
// ---------------------------------------------------------------------

#[test]
fn group_reduces_to_one_value() {
    // The group computes a single value from intermediate pushes and
    // pops; the surrounding values are untouched.
    run_ok("1 2 ( 3 4 pop pop 7 ) pop pop pop");
}

#[test]
fn array_counts_net_pushes() {
    // [ 3 2 ] leaves 3, 2, 2 on the stack.
    run_ok("[ 3 2 ] pop pop pop");
}

#[test]
fn arrays_nest() {
    // The inner array collapses into a dictionary before the outer
    // array closes, so the outer count sees one value for it.
    run_ok("[ \"ArtBox\" [ \"LeftMargin\" 1 ] dict pop pop ] pop");
}

evaluator_error_tests![
    (group_with_two_values, "( 1 2 )", ErrorKind::State),
    (group_with_no_values, "( )", ErrorKind::State),
    (end_group_without_begin, "1 ) pop", ErrorKind::State),
    (interleaved_group_and_array, "( [ ) ]", ErrorKind::State),
    (pop_cannot_cross_group_floor, "1 ( pop )", ErrorKind::State),
    (unclosed_group_at_end, "( 1", ErrorKind::State),
    (value_left_on_stack, "42", ErrorKind::State),
    (undeclared_get, "$nope pop", ErrorKind::Name),
    (duplicate_declaration, "1 !x 2 !x", ErrorKind::Name),
    (assign_to_constant, "1 :x 2 =x", ErrorKind::Name),
    (assign_to_undeclared, "1 =x", ErrorKind::Name),
    (declare_operation_name, "1 !pop", ErrorKind::Name),
    (unknown_operation, "frobnicate", ErrorKind::Name),
    (huge_integer_entity, "4294967296 pop", ErrorKind::Domain),
];

#[test]
fn variables_can_be_reassigned() {
    run_ok("1 !x 2 =x $x pop");
}

// ---------------------------------------------------------------------
// Types, promotion, atoms, strings.
// ---------------------------------------------------------------------

evaluator_error_tests![
    (promotion_over_32767, "{x} 32768 fgray", ErrorKind::Type),
    (fixed_where_integer_expected, "1.5 gray", ErrorKind::Type),
    (unknown_atom_at_use, "\"NoSuchAtom\" font_get", ErrorKind::Domain),
    (known_atom_wrong_domain, "\"ArtBox\" font_get", ErrorKind::Domain),
    (string_with_newline, "{a\nb} pop", ErrorKind::Domain),
    (empty_concat, "[ ] concat pop", ErrorKind::Domain),
];

#[test]
fn unknown_atom_is_fine_until_used() {
    run_ok("\"NoSuchAtom\" pop");
}

#[test]
fn concat_and_sep_join_strings() {
    run_ok("[ {a} {b} ] concat pop [ {a} {b} {c} ] {, } sep pop");
}

#[test]
fn promotion_at_the_boundary() {
    run_ok("0.5 fgray pop 1 fgray pop");
}

// ---------------------------------------------------------------------
// Dialect selection.
// ---------------------------------------------------------------------

evaluator_error_tests![
    (
        dictionary_then_incremental,
        "[ ] 0 dash_pattern pop start_ream",
        ErrorKind::State
    ),
    (
        incremental_then_dictionary,
        "[ {a} ] concat pop [ ] 0 dash_pattern pop",
        ErrorKind::State
    ),
];

#[test]
fn shared_operations_never_commit() {
    // Colours, transforms and paths are dialect-neutral; the source can
    // still pick either dialect afterwards.
    run_ok("0 gray pop tx_identity pop [ {a} ] concat pop");
}

// ---------------------------------------------------------------------
// Builders.
// ---------------------------------------------------------------------

evaluator_error_tests![
    (
        motion_line_requires_open_motion,
        "start_path 1 1 motion_line",
        ErrorKind::State
    ),
    (
        nested_accumulator,
        "start_path start_column",
        ErrorKind::State
    ),
    (
        finish_wrong_kind,
        "start_path finish_column",
        ErrorKind::State
    ),
    (
        modifier_without_accumulator,
        "12 style_size",
        ErrorKind::State
    ),
    (
        accumulator_left_at_end,
        "start_path",
        ErrorKind::State
    ),
    (
        ream_margin_eats_width,
        "start_ream 200 100 ream_dim 195 10 10 10 \"ArtBox\" ream_bound finish_ream pop",
        ErrorKind::Domain
    ),
    (
        ream_both_boxes_incremental,
        "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound \
         12 12 12 12 \"TrimBox\" ream_bound finish_ream pop",
        ErrorKind::Domain
    ),
    (
        stroke_dash_odd_count,
        "start_stroke [ 1 2 3 ] 0 stroke_dash finish_stroke pop",
        ErrorKind::Domain
    ),
    (
        style_requires_font,
        "start_style 12 style_size finish_style pop",
        ErrorKind::State
    ),
    (
        column_line_needs_spans,
        "start_column 0 0 start_line finish_line finish_column pop",
        ErrorKind::State
    ),
];

#[test]
fn ream_derive_copies_an_existing_ream() {
    run_ok(
        "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream !base \
         start_ream $base ream_derive 90 ream_rotate finish_ream pop $base pop",
    );
}

#[test]
fn dictionary_ream_accepts_both_boxes() {
    run_ok(
        "[ \"Width\" 200 \"Height\" 100 \
           \"ArtBox\" [ \"LeftMargin\" 12 \"TopMargin\" 12 \"RightMargin\" 12 \"BottomMargin\" 12 ] dict \
           \"TrimBox\" [ \"LeftMargin\" 11 \"TopMargin\" 11 \"RightMargin\" 11 \"BottomMargin\" 11 ] dict \
         ] dict ream pop",
    );
}

#[test]
fn stroke_style_from_dictionary() {
    run_ok(
        "[ \"Color\" ( 0 gray ) \"Width\" 2 \"Cap\" \"Round\" \
           \"Join\" \"Miter\" \"MiterLimit\" ( 30 miter_angle ) \
           \"Dash\" ( [ 3 ] 0 dash_pattern ) ] dict stroke_style pop",
    );
}

#[test]
fn single_element_dash_is_dictionary_only() {
    let err = run_err("start_stroke [ 3 ] 0 stroke_dash finish_stroke pop");
    assert_eq![err.kind, ErrorKind::Domain];
}

// ---------------------------------------------------------------------
// Fonts and images.
// ---------------------------------------------------------------------

evaluator_error_tests![
    (missing_font_file, "{missing.ttf} \"truetype\" font_load pop", ErrorKind::Resource),
    (missing_image_file, "{missing.png} \"png\" image_load pop", ErrorKind::Resource),
    (oversized_image, "{big.png} \"png\" image_load pop", ErrorKind::Domain),
    (interlaced_image, "{laced.png} \"png\" image_load pop", ErrorKind::Domain),
    (image_with_alpha, "{alpha.png} \"png\" image_load pop", ErrorKind::Domain),
    (deep_image, "{deep.png} \"png\" image_load pop", ErrorKind::Domain),
    (indexed_jpeg, "{indexed.jpg} \"jpeg\" image_load pop", ErrorKind::Domain),
    (
        synthetic_small_caps_flag,
        "\"Helvetica\" font_get [ \"SmallCaps\" 2 ] dict font_alter pop",
        ErrorKind::Domain
    ),
];

#[test]
fn synthetic_fonts_collapse() {
    run_ok(
        "\"Helvetica\" font_get [ \"HScale\" 1.2 ] dict font_alter \
         [ \"Boldness\" 0.4 ] dict font_alter pop",
    );
}

#[test]
fn indexed_png_is_accepted() {
    run_ok("{indexed.png} \"png\" image_load pop");
}

// ---------------------------------------------------------------------
// Pages and drawing.
// ---------------------------------------------------------------------

evaluator_error_tests![
    (
        draw_without_page,
        "start_path 0 0 1 1 path_rect \"Nonzero\" finish_path tx_identity null 0 gray null draw_path",
        ErrorKind::State
    ),
    (
        page_left_open,
        "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream begin_page",
        ErrorKind::State
    ),
    (
        end_page_without_page,
        "end_page",
        ErrorKind::State
    ),
    (
        draw_path_needs_paint,
        "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream begin_page \
         start_path 0 0 1 1 path_rect \"Nonzero\" finish_path tx_identity null null null draw_path end_page",
        ErrorKind::State
    ),
    (
        null_rule_cannot_fill,
        "start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream begin_page \
         start_path 0 0 1 1 path_rect \"Null\" finish_path tx_identity null 0 gray null draw_path end_page",
        ErrorKind::Domain
    ),
];

#[test]
fn filled_rectangle_lowering() {
    let text = run_ok(&format![
        "{INCREMENTAL_PAGE}\
         start_path 10 10 36 24 path_rect \"Nonzero\" finish_path \
         tx_identity null 0 gray null draw_path end_page"
    ]);
    let want = "\
scent-assembly 1.0
begin page
dim 200 100
art_box 10 10 190 90
body
save
matrix 1 0 0 1 0 0
fill_color %000000ff
begin path - nonzero -
rect 10 10 36 24
end path
restore
end page
";
    assert_eq![text, want];
}

#[test]
fn text_column_lowering() {
    let text = run_ok(&format![
        "( start_style \"Helvetica\" font_get style_font 12 style_size \
           0 gray style_fill finish_style ) :body_style \
         {INCREMENTAL_PAGE}\
         start_column 72 72 start_line {{Hello}} $body_style line_span finish_line \
         finish_column tx_identity null draw_text end_page"
    ]);
    let want = "\
scent-assembly 1.0
begin page
dim 200 100
art_box 10 10 190 90
body
font_standard F1 Helvetica
save
matrix 1 0 0 1 0 0
begin text -
advance 72 72
cspace 0
wspace 0
hscale 1
rise 0
fill_color %000000ff
text_render 0
font F1 12
write \"Hello\"
end text
restore
end page
";
    assert_eq![text, want];
}

#[test]
fn second_line_advances_by_a_delta() {
    let text = run_ok(&format![
        "( start_style \"Helvetica\" font_get style_font 12 style_size \
           0 gray style_fill finish_style ) :s \
         {INCREMENTAL_PAGE}\
         start_column 72 80 start_line {{a}} $s line_span finish_line \
         20 66 start_line {{b}} $s line_span finish_line \
         finish_column tx_identity null draw_text end_page"
    ]);
    assert![text.contains("advance 72 80\n"), "{text}"];
    assert![text.contains("advance -52 -14\n"), "{text}"];
}

#[test]
fn clip_component_wraps_in_transform_and_inverse() {
    let text = run_ok(&format![
        "{INCREMENTAL_PAGE}\
         start_path 0 0 50 50 path_rect \"Nonzero\" finish_path !shape \
         start_path 5 5 10 10 path_rect \"EvenOdd\" finish_path \
         tx_identity null 0 gray \
         [ $shape ( 10 0 tx_translate ) ] clip \
         draw_path end_page"
    ]);
    assert![text.contains("matrix 1 0 0 1 10 0\nbegin path - - nonzero\nrect 0 0 50 50\nend path\nmatrix 1 0 0 1 -10 0\n"), "{text}"];
}

#[test]
fn small_caps_splits_runs() {
    let text = run_ok(&format![
        "( start_style \"Helvetica\" font_get [ \"SmallCaps\" 1 ] dict font_alter style_font \
           12 style_size 0 gray style_fill finish_style ) :s \
         {INCREMENTAL_PAGE}\
         start_column 10 10 start_line {{Hi}} $s line_span finish_line \
         finish_column tx_identity null draw_text end_page"
    ]);
    assert![text.contains("font F1 12\nwrite \"H\"\nfont F1 9.6\nwrite \"I\"\n"), "{text}"];
}

#[test]
fn oblique_fails_at_draw_time() {
    let err = run_err(&format![
        "( start_style \"Helvetica\" font_get [ \"Oblique\" 12 ] dict font_alter style_font \
           12 style_size 0 gray style_fill finish_style ) :s \
         {INCREMENTAL_PAGE}\
         start_column 10 10 start_line {{x}} $s line_span finish_line \
         finish_column tx_identity null draw_text end_page"
    ]);
    assert_eq![err.kind, ErrorKind::Domain];
}

#[test]
fn image_drawing_declares_then_places() {
    let text = run_ok(&format![
        "{{photo.jpg}} \"jpeg\" image_load !img \
         {INCREMENTAL_PAGE}\
         $img 64 64 tx_scale null draw_image end_page"
    ]);
    assert![text.contains("image_jpeg I1 \"photo.jpg\"\n"), "{text}"];
    assert![text.contains("matrix 64 0 0 64 0 0\nimage I1\n"), "{text}"];
}

// ---------------------------------------------------------------------
// Embedded sources.
// ---------------------------------------------------------------------

const EMBEDDED: &str = "@{ scent-embed 1.0 @}\n\
    @bound-x 0 @bound-y 0 @bound-w 100 @bound-h 50\n@body\n\
    start_path 1 1 20 20 path_rect \"Nonzero\" finish_path \
    tx_identity null 0 gray null draw_path\n@end";

fn embed_host(path: &str) -> String {
    format![
        "@{{ scent 1.0 @}}\n\
         start_ream 200 100 ream_dim 10 10 10 10 \"ArtBox\" ream_bound finish_ream begin_page \
         [ {{a}} ] concat pop \
         {{{path}}} tx_identity null draw_embed end_page"
    ]
}

#[test]
fn draw_embed_runs_the_embedded_source() {
    let fs = MemoryFileSystem::default().with("panel.scn", EMBEDDED);
    let text = compile_with_files(&embed_host("panel.scn"), &fs).unwrap();
    // The embedded drawing is wrapped in the host's save, transform and
    // the clip to the declared bounds.
    assert![text.contains("begin path - - nonzero\nrect 0 0 100 50\nend path\n"), "{text}"];
    assert![text.contains("rect 1 1 20 20\n"), "{text}"];
}

#[test]
fn draw_embed_rejects_document_headers() {
    let fs = MemoryFileSystem::default().with("doc.scn", "@{ scent 1.0 @}\n");
    let err = compile_with_files(&embed_host("doc.scn"), &fs).unwrap_err();
    assert_eq![err.kind, ErrorKind::State];
}

#[test]
fn embedded_sources_cannot_open_pages() {
    let embedded = "@{ scent-embed 1.0 @}\n\
        @bound-x 0 @bound-y 0 @bound-w 10 @bound-h 10\n@body\n\
        start_ream 10 10 ream_dim 1 1 1 1 \"ArtBox\" ream_bound finish_ream begin_page";
    let fs = MemoryFileSystem::default().with("bad.scn", embedded);
    let err = compile_with_files(&embed_host("bad.scn"), &fs).unwrap_err();
    assert_eq![err.kind, ErrorKind::State];
}

#[test]
fn embedded_leftover_stack_is_an_error() {
    let embedded = "@{ scent-embed 1.0 @}\n\
        @bound-x 0 @bound-y 0 @bound-w 10 @bound-h 10\n@body\n42";
    let fs = MemoryFileSystem::default().with("bad.scn", embedded);
    let err = compile_with_files(&embed_host("bad.scn"), &fs).unwrap_err();
    assert_eq![err.kind, ErrorKind::State];
}

// ---------------------------------------------------------------------
// Headers.
// ---------------------------------------------------------------------

#[test]
fn embedded_source_cannot_be_compiled_directly() {
    let err = compile_to_text(EMBEDDED).unwrap_err();
    assert_eq![err.kind, ErrorKind::State];
}

#[test]
fn errors_carry_lines() {
    // The helper prepends the one-line header, so the duplicate
    // declaration sits on line 3.
    let err = run_err("1 !x\n2 !x");
    assert_eq![err.line, Some(3)];
}
