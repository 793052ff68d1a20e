//! Routine/unit assembly: one Java class per top-level routine.

use plcsql_ast::{SourceMap, Unit};
use tracing::trace;

use crate::code::{Code, Mark};
use crate::config::EmitConfig;
use crate::decl;
use crate::imports::imports;

/// The Java source of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JavaSource {
    pub class_name: String,
    pub text: String,
}

pub fn assemble(unit: &Unit, config: &EmitConfig, source: Option<&SourceMap>) -> JavaSource {
    let routine = &unit.routine;
    let sig = routine.sig();
    let class_name =
        unit.class_name(&config.class_prefix_function, &config.class_prefix_procedure);
    trace!(class = %class_name, routine = %routine.scope.routine, "assembling unit");

    let mut guarded = Code::text("Long[] sql_rowcount = new Long[] { null };");
    if unit.connection_required {
        guarded.line(format!(
            "Connection conn = DriverManager.getConnection(\"jdbc:default:connection::?autonomous_transaction={}\");",
            unit.autonomous_transaction
        ));
    }
    guarded.append(decl::decl_class(&routine.scope, &routine.decls));
    guarded.append(crate::stmt::body(&routine.body));

    let file = format!("{class_name}.java");
    let mut method = decl::nullify_out_params(&sig.params);
    method.line("try {");
    method.nest(guarded);
    method.append(Code::template([
        "} catch (PlcsqlRuntimeError e) {".to_string(),
        "  Throwable c = e.getCause();".to_string(),
        format!("  int[] pos = getPlcLineColumn(codeRangeMarkerList, c == null ? e : c, \"{file}\");"),
        "  throw e.setPlcLineColumn(pos);".to_string(),
        "} catch (OutOfMemoryError e) {".to_string(),
        "  Server.log(e);".to_string(),
        format!("  int[] pos = getPlcLineColumn(codeRangeMarkerList, e, \"{file}\");"),
        "  throw new STORAGE_ERROR().setPlcLineColumn(pos);".to_string(),
        "} catch (Throwable e) {".to_string(),
        "  Server.log(e);".to_string(),
        format!("  int[] pos = getPlcLineColumn(codeRangeMarkerList, e, \"{file}\");"),
        "  throw new PROGRAM_ERROR().setPlcLineColumn(pos);".to_string(),
        "}".to_string(),
    ]));

    let ret = sig.ret.map_or("void", |t| t.java_type());
    let mut class = Code::new();
    class.blank();
    class.append(
        Code::call(
            &format!("public static {ret} {}", routine.name()),
            decl::params(&sig.params),
        )
        .suffix(" throws Exception {"),
    );
    class.nest(method);
    class.line("}");

    let mut file_code = Code::template(imports(unit));
    file_code.line("import static com.cubrid.plcsql.predefined.sp.SpLib.*;");
    file_code.blank();
    file_code.line(format!("public class {class_name} {{"));
    file_code.nest(class);

    let map = source.filter(|_| config.line_markers);
    let markers = code_range_markers(file_code.marks(), file_code.len(), map);
    file_code.nest(Code::text(format!(
        "private static List<CodeRangeMarker> codeRangeMarkerList = buildCodeRangeMarkerList(\"{markers}\");"
    )));
    file_code.line("}");

    let text = file_code.render(config.indent_width);
    JavaSource { class_name, text }
}

/// The runtime's position table: ` (<java-line>,<line>,<col>` opens a range,
/// ` )<java-line>` closes it at the first line past its end. The whole unit is
/// the outermost range.
pub fn code_range_markers(marks: &[Mark], lines: usize, source: Option<&SourceMap>) -> String {
    let mut out = String::from(" (1,1,1");
    if let Some(source) = source {
        let mut marks = marks.to_vec();
        marks.sort_by(|a, b| a.first.cmp(&b.first).then(b.end.cmp(&a.end)));

        let mut open: Vec<usize> = Vec::new();
        for m in marks {
            while let Some(&end) = open.last() {
                if end > m.first {
                    break;
                }
                out.push_str(&format!(" ){}", end + 1));
                open.pop();
            }
            let pos = source.line_col(m.span);
            out.push_str(&format!(" ({},{},{}", m.first + 1, pos.line, pos.col));
            open.push(m.end);
        }
        while let Some(end) = open.pop() {
            out.push_str(&format!(" ){}", end + 1));
        }
    }
    out.push_str(&format!(" ){}", lines + 1));
    out
}
